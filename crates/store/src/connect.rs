//! Connection construction, modelled as a function value rather than a
//! builder subclass.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::cassandra::CassandraWordCountStore;
use crate::Result;

/// Credentials for a managed cluster: the secure connect bundle plus the
/// client id / secret pair used for plain-text authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub bundle: PathBuf,
    pub client_id: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(
        bundle: impl Into<PathBuf>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            bundle: bundle.into(),
            client_id: client_id.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bundle", &self.bundle)
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Opens a store from credentials. Each call opens a new connection.
pub type ConnectionFactory<S> = Arc<dyn Fn(Credentials) -> BoxFuture<'static, Result<S>> + Send + Sync>;

/// Wraps an async closure as a [`ConnectionFactory`].
pub fn factory_fn<S, F, Fut>(f: F) -> ConnectionFactory<S>
where
    F: Fn(Credentials) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S>> + Send + 'static,
{
    Arc::new(move |credentials: Credentials| f(credentials).boxed())
}

/// The production factory: secure connect bundle plus plain-text auth.
pub fn cassandra_factory() -> ConnectionFactory<CassandraWordCountStore> {
    factory_fn(|credentials: Credentials| async move {
        CassandraWordCountStore::connect(&credentials).await
    })
}
