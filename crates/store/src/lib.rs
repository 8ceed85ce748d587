//! Storage for the `example.wordcount` table.
//!
//! - [`WordCountStore`] trait with an in-memory and a Cassandra backend
//! - [`setup_schema`] to drop and recreate the table before a run
//! - [`SecureConnectBundle`], [`SniTunnels`] and [`ConnectionFactory`] for opening sessions

pub mod astra;
pub mod bundle;
pub mod cassandra;
pub mod connect;
pub mod error;
pub mod memory;
pub mod schema;
pub mod store;

#[cfg(test)]
mod testing;

pub use astra::{ClusterMetadata, SniTunnels, fetch_metadata};
pub use bundle::SecureConnectBundle;
pub use cassandra::CassandraWordCountStore;
pub use common::WordCount;
pub use connect::{ConnectionFactory, Credentials, cassandra_factory, factory_fn};
pub use error::{Result, StoreError};
pub use memory::InMemoryWordCountStore;
pub use schema::setup_schema;
pub use store::{WordCountStore, WordCountStoreExt};
