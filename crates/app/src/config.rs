//! Job configuration loaded from a properties file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use store::Credentials;
use thiserror::Error;

/// Key naming the secure connect bundle.
pub const ASTRA_SCB: &str = "astra.scb";
/// Key holding the client id.
pub const ASTRA_CLIENTID: &str = "astra.clientid";
/// Key holding the client secret.
pub const ASTRA_SECRET: &str = "astra.secret";

/// Environment variable naming the properties file.
pub const PROPERTIES_ENV: &str = "WORDCOUNT_PROPERTIES";
/// Properties file used when [`PROPERTIES_ENV`] is unset.
pub const DEFAULT_PROPERTIES: &str = "app.properties";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The properties file could not be read.
    #[error("Cannot read properties file {}: {source}", path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The properties text is malformed, e.g. a bad `\u` escape.
    #[error("Malformed properties: {0}")]
    Parse(#[from] java_properties::PropertiesError),

    /// A required key is absent.
    #[error("Missing required property '{0}'")]
    MissingKey(&'static str),
}

/// Credentials for the managed cluster.
///
/// Values are taken as-is; bad credentials only show up when the first
/// connection is attempted.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub bundle: PathBuf,
    pub client_id: String,
    pub secret: String,
}

impl Config {
    /// Loads the file named by `WORDCOUNT_PROPERTIES`, or `app.properties`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(PROPERTIES_ENV).unwrap_or_else(|_| DEFAULT_PROPERTIES.to_string());
        Self::from_properties_file(path)
    }

    /// Reads a properties file. A relative bundle path is resolved against
    /// the directory holding the file.
    pub fn from_properties_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Missing {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_properties(java_properties::read(std::io::BufReader::new(file))?)?;
        if config.bundle.is_relative() {
            if let Some(dir) = path.parent() {
                config.bundle = dir.join(&config.bundle);
            }
        }

        tracing::debug!(path = %path.display(), bundle = %config.bundle.display(), "loaded configuration");
        Ok(config)
    }

    /// Parses properties text with the `java.util.Properties` grammar:
    /// `=`, `:` or whitespace separators, backslash escapes and line
    /// continuations. Bytes are read as ISO-8859-1.
    pub fn from_properties_str(text: &str) -> Result<Self, ConfigError> {
        Self::from_properties(java_properties::read(text.as_bytes())?)
    }

    fn from_properties(mut props: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut take = |key: &'static str| props.remove(key).ok_or(ConfigError::MissingKey(key));

        Ok(Self {
            bundle: PathBuf::from(take(ASTRA_SCB)?),
            client_id: take(ASTRA_CLIENTID)?,
            secret: take(ASTRA_SECRET)?,
        })
    }

    /// Returns the credentials handed to the connection factory.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.bundle, &self.client_id, &self.secret)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bundle", &self.bundle)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}
