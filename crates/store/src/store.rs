use async_trait::async_trait;

use crate::{Result, WordCount};

/// Core trait for word-count table backends.
///
/// One implementation talks to a Cassandra cluster, the other keeps the
/// table in memory for tests. All implementations must be thread-safe.
#[async_trait]
pub trait WordCountStore: Send + Sync {
    /// Drops the table if it exists.
    async fn drop_table(&self) -> Result<()>;

    /// Creates the table if it does not exist.
    async fn create_table(&self) -> Result<()>;

    /// Writes the pair, overwriting any existing row for the same word.
    async fn upsert(&self, pair: &WordCount) -> Result<()>;

    /// Returns the row for a word, if present.
    async fn get(&self, word: &str) -> Result<Option<WordCount>>;

    /// Returns every row, ordered by word.
    async fn all(&self) -> Result<Vec<WordCount>>;
}

/// Extension trait providing convenience methods for word-count stores.
#[async_trait]
pub trait WordCountStoreExt: WordCountStore {
    /// Drops and recreates the table, in that order.
    async fn recreate_table(&self) -> Result<()> {
        self.drop_table().await?;
        self.create_table().await
    }

    /// Returns the persisted count for a word, or zero when it has no row.
    async fn count_for(&self, word: &str) -> Result<i64> {
        Ok(self.get(word).await?.map(|pair| pair.count).unwrap_or(0))
    }
}

// Blanket implementation for all WordCountStore implementations
impl<T: WordCountStore + ?Sized> WordCountStoreExt for T {}

