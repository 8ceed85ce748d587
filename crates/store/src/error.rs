use thiserror::Error;

/// Boxed driver error, kept opaque so callers do not depend on driver types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when talking to the word-count table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Authentication or network setup failed while opening a session.
    #[error("Connectivity error: {0}")]
    Connectivity(#[source] BoxError),

    /// A DDL statement was rejected.
    #[error("Schema error on `{statement}`: {source}")]
    Schema {
        statement: &'static str,
        #[source]
        source: BoxError,
    },

    /// An upsert for a single word failed.
    #[error("Write error for word '{word}': {source}")]
    Write {
        word: String,
        #[source]
        source: BoxError,
    },

    /// Reading rows back failed.
    #[error("Read error: {0}")]
    Read(#[source] BoxError),

    /// The secure connect bundle is missing or malformed.
    #[error("Secure connect bundle error: {0}")]
    Bundle(String),

    /// Building the TLS context from the bundle failed.
    #[error("TLS error: {0}")]
    Tls(#[from] openssl::error::ErrorStack),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bundle's `config.json` could not be parsed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Builds a [`StoreError::Write`] from any error.
    pub fn write(word: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Write {
            word: word.into(),
            source: source.into(),
        }
    }

    /// Builds a [`StoreError::Schema`] from any error.
    pub fn schema(statement: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Schema {
            statement,
            source: source.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
