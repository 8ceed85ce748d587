//! Astra word-count job.
//!
//! Loads credentials, drops and recreates `example.wordcount`, then counts
//! the words of a fixed set of sentences and upserts every running total
//! into the table while printing it to the console.

pub mod config;
pub mod error;

use pipeline::{
    FailureHandler, PipelineRunner, RunSummary, SENTENCES, Sink, SinkPolicy, StoreSink,
    word_counts,
};
use store::{ConnectionFactory, WordCountStore, setup_schema};

pub use config::{Config, ConfigError};
pub use error::{AppError, Result};

/// Job name attached to the pipeline's tracing span.
pub const JOB_NAME: &str = "astra-wordcount";

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Nothing loaded yet.
    Unconfigured,
    /// The table has been dropped and recreated; the pipeline may start.
    SchemaReady,
    /// Every input line has been processed and every pair delivered.
    Complete,
    /// Configuration, connection, schema or a fatal sink failed.
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Unconfigured => "unconfigured",
            RunState::SchemaReady => "schema-ready",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Sequences one run: configuration, schema setup, then the pipeline.
pub struct Driver<S: WordCountStore> {
    factory: ConnectionFactory<S>,
    console: Option<Box<dyn Sink>>,
    failure_handler: FailureHandler,
    state: RunState,
}

impl<S: WordCountStore + 'static> Driver<S> {
    /// Creates a driver that opens connections through `factory`.
    pub fn new(factory: ConnectionFactory<S>) -> Self {
        Self {
            factory,
            console: None,
            failure_handler: FailureHandler::logging(),
            state: RunState::Unconfigured,
        }
    }

    /// Adds a console sink. Its failures are fatal.
    pub fn with_console(mut self, console: Box<dyn Sink>) -> Self {
        self.console = Some(console);
        self
    }

    /// Replaces the callback for failed table writes.
    pub fn with_failure_handler(mut self, handler: FailureHandler) -> Self {
        self.failure_handler = handler;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs the job over the fixed sentences.
    pub async fn run<F>(&mut self, load_config: F) -> Result<RunSummary>
    where
        F: FnOnce() -> std::result::Result<Config, ConfigError>,
    {
        self.run_lines(load_config, SENTENCES).await
    }

    /// Runs the job over the given lines.
    ///
    /// Configuration is loaded before any connection is opened, and the
    /// schema step finishes (releasing its connection) before the first
    /// sink write.
    #[tracing::instrument(skip_all, fields(job = JOB_NAME))]
    pub async fn run_lines<F, I>(&mut self, load_config: F, lines: I) -> Result<RunSummary>
    where
        F: FnOnce() -> std::result::Result<Config, ConfigError>,
        I: IntoIterator,
        I::Item: AsRef<str>,
        I::IntoIter: Send,
    {
        let result = self.execute(load_config, lines).await;
        match &result {
            Ok(summary) => {
                self.transition(RunState::Complete);
                tracing::info!(%summary, "run complete");
            }
            Err(err) => {
                self.transition(RunState::Failed);
                tracing::error!(error = %err, "run failed");
            }
        }
        result
    }

    async fn execute<F, I>(&mut self, load_config: F, lines: I) -> Result<RunSummary>
    where
        F: FnOnce() -> std::result::Result<Config, ConfigError>,
        I: IntoIterator,
        I::Item: AsRef<str>,
        I::IntoIter: Send,
    {
        let config = load_config()?;
        let credentials = config.credentials();

        setup_schema(&self.factory, credentials.clone()).await?;
        self.transition(RunState::SchemaReady);

        let store = (self.factory)(credentials).await?;

        let mut runner =
            PipelineRunner::new(JOB_NAME).with_failure_handler(self.failure_handler.clone());
        runner.add_sink(Box::new(StoreSink::new(store)), SinkPolicy::Recover);
        if let Some(console) = self.console.take() {
            runner.add_sink(console, SinkPolicy::Fatal);
        }

        Ok(runner.run(word_counts(lines)).await?)
    }

    fn transition(&mut self, next: RunState) {
        tracing::info!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::{InMemoryWordCountStore, factory_fn};

    fn valid_config() -> std::result::Result<Config, ConfigError> {
        Config::from_properties_str("astra.scb=scb.zip\nastra.clientid=c\nastra.secret=s\n")
    }

    fn driver(store: &InMemoryWordCountStore) -> Driver<InMemoryWordCountStore> {
        let store = store.clone();
        Driver::new(factory_fn(move |_| {
            let store = store.clone();
            async move { Ok(store) }
        }))
        .with_failure_handler(FailureHandler::new(|_, _| {}))
    }

    #[test]
    fn state_display() {
        assert_eq!(RunState::SchemaReady.to_string(), "schema-ready");
        assert_eq!(RunState::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn starts_unconfigured() {
        let store = InMemoryWordCountStore::new();
        assert_eq!(driver(&store).state(), RunState::Unconfigured);
    }

    #[tokio::test]
    async fn successful_run_completes() {
        let store = InMemoryWordCountStore::new();
        let mut driver = driver(&store);

        let summary = driver.run(valid_config).await.unwrap();

        assert_eq!(driver.state(), RunState::Complete);
        assert_eq!(summary.records_emitted, 20);
        assert_eq!(summary.distinct_words, 18);
    }

    #[tokio::test]
    async fn config_failure_ends_in_failed() {
        let store = InMemoryWordCountStore::new();
        let mut driver = driver(&store);

        let err = driver
            .run(|| Err(ConfigError::MissingKey(config::ASTRA_SECRET)))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Config(_)));
        assert_eq!(driver.state(), RunState::Failed);
        assert!(!store.table_exists().await);
    }

    #[tokio::test]
    async fn schema_failure_ends_in_failed() {
        let store = InMemoryWordCountStore::new().with_rejected_schema();
        let mut driver = driver(&store);

        let err = driver.run(valid_config).await.unwrap_err();

        assert!(matches!(err, AppError::Schema(_)));
        assert_eq!(driver.state(), RunState::Failed);
        assert_eq!(store.write_attempts(), 0);
    }
}
