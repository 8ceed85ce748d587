//! Pipeline error types.

use thiserror::Error;

/// Errors raised by a single sink write.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The table write failed.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    /// Writing to the console failed.
    #[error("Console error: {0}")]
    Console(#[from] std::io::Error),
}

/// Errors that stop a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A sink whose failures are fatal could not write.
    #[error("Sink '{sink}' failed: {source}")]
    Sink {
        sink: &'static str,
        #[source]
        source: SinkError,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
