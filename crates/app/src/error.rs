//! Application error types with process exit code mapping.

use pipeline::PipelineError;
use store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Unrecovered failures that end a run in [`crate::RunState::Failed`].
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or incomplete.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The cluster could not be reached or refused the credentials.
    #[error("Connectivity error: {0}")]
    Connectivity(#[source] StoreError),

    /// The cluster rejected a DDL statement.
    #[error("Schema error: {0}")]
    Schema(#[source] StoreError),

    /// Any other store failure outside the sink.
    #[error("Store error: {0}")]
    Store(#[source] StoreError),

    /// A fatal sink failed during the run.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

impl AppError {
    /// Process exit status for this error. Always nonzero.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Connectivity(_) => 3,
            AppError::Schema(_) => 4,
            AppError::Store(_) | AppError::Pipeline(_) => 1,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connectivity(_)
            | StoreError::Bundle(_)
            | StoreError::Tls(_)
            | StoreError::Io(_)
            | StoreError::Serialization(_) => AppError::Connectivity(err),
            StoreError::Schema { .. } => AppError::Schema(err),
            _ => AppError::Store(err),
        }
    }
}

/// Convenience type alias for application results.
pub type Result<T> = std::result::Result<T, AppError>;
