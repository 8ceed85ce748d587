//! Drives a word-count stream to completion and fans pairs out to sinks.

use std::collections::HashSet;

use common::WordCount;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::PipelineError;
use crate::sink::{FailureHandler, Sink};
use crate::Result;

/// What happens when a sink fails to write a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkPolicy {
    /// Report to the failure handler and keep going.
    Recover,
    /// Stop the run with [`PipelineError::Sink`].
    Fatal,
}

/// Counters collected over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pairs pulled from the stream.
    pub records_emitted: u64,
    /// Recoverable sink writes that failed.
    pub write_failures: u64,
    /// Distinct words seen.
    pub distinct_words: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records, {} distinct words, {} write failures",
            self.records_emitted, self.distinct_words, self.write_failures
        )
    }
}

/// Delivers every pair of a stream to the registered sinks.
///
/// Sinks see pairs in stream order and in registration order, one pair at
/// a time, so updates for the same word reach each sink in the order they
/// were produced.
pub struct PipelineRunner {
    name: String,
    sinks: Vec<(Box<dyn Sink>, SinkPolicy)>,
    failure_handler: FailureHandler,
}

impl PipelineRunner {
    /// Creates a runner for the named job with no sinks.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sinks: Vec::new(),
            failure_handler: FailureHandler::default(),
        }
    }

    /// Replaces the callback for recoverable sink failures.
    pub fn with_failure_handler(mut self, handler: FailureHandler) -> Self {
        self.failure_handler = handler;
        self
    }

    /// Registers a sink.
    pub fn add_sink(&mut self, sink: Box<dyn Sink>, policy: SinkPolicy) {
        self.sinks.push((sink, policy));
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Returns the job name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consumes the whole stream, writing each pair to every sink.
    #[tracing::instrument(skip(self, stream), fields(job = %self.name))]
    pub async fn run<St>(&self, stream: St) -> Result<RunSummary>
    where
        St: Stream<Item = WordCount> + Send,
    {
        let mut stream = std::pin::pin!(stream);
        let mut summary = RunSummary::default();
        let mut words = HashSet::new();

        while let Some(pair) = stream.next().await {
            summary.records_emitted += 1;
            metrics::counter!("wordcount_records_emitted").increment(1);
            if !words.contains(&pair.word) {
                words.insert(pair.word.clone());
            }

            for (sink, policy) in &self.sinks {
                let Err(err) = sink.write(&pair).await else {
                    continue;
                };
                match policy {
                    SinkPolicy::Recover => {
                        summary.write_failures += 1;
                        metrics::counter!("wordcount_sink_failures").increment(1);
                        self.failure_handler.report(&pair, &err);
                    }
                    SinkPolicy::Fatal => {
                        tracing::error!(sink = sink.name(), error = %err, "fatal sink failure");
                        return Err(PipelineError::Sink {
                            sink: sink.name(),
                            source: err,
                        });
                    }
                }
            }
        }

        summary.distinct_words = words.len();
        tracing::info!(
            records = summary.records_emitted,
            distinct_words = summary.distinct_words,
            write_failures = summary.write_failures,
            "pipeline complete"
        );

        Ok(summary)
    }
}
