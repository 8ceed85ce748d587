//! Result sinks and the failure callback for recoverable sink errors.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::WordCount;
use store::WordCountStore;

use crate::error::SinkError;

/// Destination for the pairs a pipeline emits.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Returns the name of this sink.
    fn name(&self) -> &'static str;

    /// Writes a single pair.
    async fn write(&self, pair: &WordCount) -> Result<(), SinkError>;
}

/// Upserts every pair into the word-count table.
pub struct StoreSink<S: WordCountStore> {
    store: S,
}

impl<S: WordCountStore> StoreSink<S> {
    /// Creates a sink writing through the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Gets a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: WordCountStore> Sink for StoreSink<S> {
    fn name(&self) -> &'static str {
        "StoreSink"
    }

    async fn write(&self, pair: &WordCount) -> Result<(), SinkError> {
        self.store.upsert(pair).await?;
        Ok(())
    }
}

/// Prints one `(word,count)` line per pair through a single writer.
pub struct ConsoleSink<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleSink<io::Stdout> {
    /// Creates a sink printing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Creates a sink printing to the given writer.
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn name(&self) -> &'static str {
        "ConsoleSink"
    }

    async fn write(&self, pair: &WordCount) -> Result<(), SinkError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("console writer poisoned"))?;
        writeln!(out, "{pair}")?;
        out.flush()?;
        Ok(())
    }
}

/// Callback invoked for sink failures that do not stop the run.
#[derive(Clone)]
pub struct FailureHandler(Arc<dyn Fn(&WordCount, &SinkError) + Send + Sync>);

impl FailureHandler {
    /// Wraps a callback.
    pub fn new(handler: impl Fn(&WordCount, &SinkError) + Send + Sync + 'static) -> Self {
        Self(Arc::new(handler))
    }

    /// Logs each failure at `error` level.
    pub fn logging() -> Self {
        Self::new(|pair, err| {
            tracing::error!(word = %pair.word, count = pair.count, error = %err, "Exception in C* ops");
        })
    }

    /// Reports a failure to the callback.
    pub fn report(&self, pair: &WordCount, err: &SinkError) {
        (self.0)(pair, err)
    }
}

impl Default for FailureHandler {
    fn default() -> Self {
        Self::logging()
    }
}

impl std::fmt::Debug for FailureHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FailureHandler").finish_non_exhaustive()
    }
}
