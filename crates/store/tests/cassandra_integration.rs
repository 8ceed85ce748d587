//! Cassandra integration tests
//!
//! These tests start a ScyllaDB container, which speaks the same CQL
//! protocol as Astra. They need Docker and are ignored by default:
//!
//! ```bash
//! cargo test -p store --test cassandra_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use scylla::SessionBuilder;
use store::schema::KEYSPACE;
use store::{
    CassandraWordCountStore, Credentials, StoreError, WordCount, WordCountStore,
    WordCountStoreExt, factory_fn, setup_schema,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::scylladb::ScyllaDB;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<ScyllaDB>,
    contact_point: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = ScyllaDB::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(9042).await.unwrap();
            let contact_point = format!("{host}:{port}");

            // Astra provisions the keyspace; a bare cluster needs it created.
            let session = SessionBuilder::new()
                .known_node(&contact_point)
                .build()
                .await
                .unwrap();
            session
                .query_unpaged(
                    format!(
                        "CREATE KEYSPACE IF NOT EXISTS {KEYSPACE} WITH replication = \
                         {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
                    ),
                    (),
                )
                .await
                .unwrap();

            Arc::new(ContainerInfo {
                container,
                contact_point,
            })
        })
        .await
        .clone()
}

async fn get_test_store() -> CassandraWordCountStore {
    let info = get_container_info().await;
    let session = SessionBuilder::new()
        .known_node(&info.contact_point)
        .build()
        .await
        .unwrap();
    CassandraWordCountStore::from_session(session)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn recreate_table_and_upsert() {
    let store = get_test_store().await;
    store.recreate_table().await.unwrap();

    store.upsert(&WordCount::new("the", 1)).await.unwrap();
    store.upsert(&WordCount::new("the", 2)).await.unwrap();
    store.upsert(&WordCount::new("fox", 1)).await.unwrap();

    assert_eq!(store.count_for("the").await.unwrap(), 2);
    assert_eq!(
        store.all().await.unwrap(),
        vec![WordCount::new("fox", 1), WordCount::new("the", 2)]
    );
}

#[tokio::test]
#[ignore = "requires docker"]
async fn get_missing_word_returns_none() {
    let store = get_test_store().await;
    store.recreate_table().await.unwrap();

    assert_eq!(store.get("absent").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn setup_schema_through_factory() {
    let info = get_container_info().await;
    let contact_point = info.contact_point.clone();
    let factory = factory_fn(move |_| {
        let contact_point = contact_point.clone();
        async move {
            let session = SessionBuilder::new()
                .known_node(contact_point)
                .build()
                .await
                .map_err(|err| StoreError::Connectivity(Box::new(err)))?;
            Ok(CassandraWordCountStore::from_session(session))
        }
    });

    let store = get_test_store().await;
    store.recreate_table().await.unwrap();
    store.upsert(&WordCount::new("stale", 7)).await.unwrap();

    setup_schema(&factory, Credentials::new("unused.zip", "cassandra", "cassandra"))
        .await
        .unwrap();

    assert!(get_test_store().await.all().await.unwrap().is_empty());
}
