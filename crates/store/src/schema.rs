//! Table layout and the drop/create step that runs before the pipeline.

use crate::connect::{ConnectionFactory, Credentials};
use crate::store::{WordCountStore, WordCountStoreExt};
use crate::Result;

/// Keyspace holding the word-count table. It must exist before the run.
pub const KEYSPACE: &str = "example";

/// Table name inside [`KEYSPACE`].
pub const TABLE: &str = "wordcount";

pub const DROP_TABLE: &str = "DROP TABLE IF EXISTS example.wordcount";

pub const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS example.wordcount (word text, count bigint, PRIMARY KEY(word))";

/// Cassandra inserts overwrite rows with the same primary key, so this is an upsert.
pub const UPSERT: &str = "INSERT INTO example.wordcount(word, count) VALUES (?, ?)";

pub const SELECT_ONE: &str = "SELECT word, count FROM example.wordcount WHERE word = ?";

pub const SELECT_ALL: &str = "SELECT word, count FROM example.wordcount";

/// Opens a connection, drops and recreates the word-count table, then
/// releases the connection.
///
/// The connection is dropped on every path out of this function, so a
/// failed DDL statement never leaves a session open behind it.
#[tracing::instrument(skip(factory, credentials), fields(table = TABLE))]
pub async fn setup_schema<S>(factory: &ConnectionFactory<S>, credentials: Credentials) -> Result<()>
where
    S: WordCountStore + 'static,
{
    let store = factory(credentials).await?;
    let result = store.recreate_table().await;
    drop(store);

    match &result {
        Ok(()) => tracing::info!("schema ready"),
        Err(err) => tracing::error!(error = %err, "schema setup failed"),
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::connect::factory_fn;
    use crate::{InMemoryWordCountStore, StoreError, WordCount};

    fn credentials() -> Credentials {
        Credentials::new("secure-connect-example.zip", "client", "secret")
    }

    #[tokio::test]
    async fn setup_creates_empty_table() {
        let store = InMemoryWordCountStore::new();
        let shared = store.clone();
        let factory = factory_fn(move |_| {
            let store = shared.clone();
            async move { Ok(store) }
        });

        setup_schema(&factory, credentials()).await.unwrap();

        assert!(store.table_exists().await);
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn setup_drops_existing_rows() {
        let store = InMemoryWordCountStore::new();
        store.create_table().await.unwrap();
        store.upsert(&WordCount::new("stale", 9)).await.unwrap();

        let shared = store.clone();
        let factory = factory_fn(move |_| {
            let store = shared.clone();
            async move { Ok(store) }
        });
        setup_schema(&factory, credentials()).await.unwrap();

        assert_eq!(store.get("stale").await.unwrap(), None);
    }

    #[tokio::test]
    async fn connection_failure_is_reported_as_connectivity() {
        let factory: ConnectionFactory<InMemoryWordCountStore> = factory_fn(|_| async {
            Err(StoreError::Connectivity("authentication failed".into()))
        });

        let err = setup_schema(&factory, credentials()).await.unwrap_err();
        assert!(matches!(err, StoreError::Connectivity(_)));
    }

    #[tokio::test]
    async fn rejected_ddl_is_reported_as_schema_error() {
        let store = InMemoryWordCountStore::new().with_rejected_schema();
        let shared = store.clone();
        let factory = factory_fn(move |_| {
            let store = shared.clone();
            async move { Ok(store) }
        });

        let err = setup_schema(&factory, credentials()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Schema {
                statement: DROP_TABLE,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn connection_is_released_after_setup() {
        let opened = Arc::new(AtomicUsize::new(0));
        let store = InMemoryWordCountStore::new();
        let shared = store.clone();
        let counter = Arc::clone(&opened);
        let factory = factory_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let store = shared.clone();
            async move { Ok(store) }
        });

        setup_schema(&factory, credentials()).await.unwrap();

        assert_eq!(opened.load(Ordering::SeqCst), 1);
        // The test's handle and the factory's handle; the session is gone.
        assert_eq!(store.handle_count(), 2);
    }

    #[tokio::test]
    async fn connection_is_released_after_failed_ddl() {
        let store = InMemoryWordCountStore::new().with_rejected_schema();
        let shared = store.clone();
        let factory = factory_fn(move |_| {
            let store = shared.clone();
            async move { Ok(store) }
        });

        assert!(setup_schema(&factory, credentials()).await.is_err());
        assert_eq!(store.handle_count(), 2);
    }
}
