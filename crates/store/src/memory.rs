use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::schema::{CREATE_TABLE, DROP_TABLE, UPSERT};
use crate::store::WordCountStore;
use crate::{Result, StoreError, WordCount};

/// In-memory word-count store for testing.
///
/// Clones share the same table, the way several sessions share one
/// cluster. `None` means the table does not exist, so writes issued before
/// [`WordCountStore::create_table`] fail the same way they would against a
/// real cluster without the schema.
#[derive(Clone, Default)]
pub struct InMemoryWordCountStore {
    table: Arc<RwLock<Option<BTreeMap<String, i64>>>>,
    failing_words: Arc<RwLock<HashSet<String>>>,
    write_attempts: Arc<AtomicUsize>,
    reject_schema: bool,
}

impl InMemoryWordCountStore {
    /// Creates a new store with no table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every DDL statement fail with [`StoreError::Schema`].
    pub fn with_rejected_schema(mut self) -> Self {
        self.reject_schema = true;
        self
    }

    /// Makes every upsert for `word` fail with [`StoreError::Write`].
    pub async fn fail_writes_for(&self, word: impl Into<String>) {
        self.failing_words.write().await.insert(word.into());
    }

    /// Returns whether the table currently exists.
    pub async fn table_exists(&self) -> bool {
        self.table.read().await.is_some()
    }

    /// Number of upserts attempted so far, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Number of live handles sharing this table.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.table)
    }

    fn check_schema(&self, statement: &'static str) -> Result<()> {
        if self.reject_schema {
            return Err(StoreError::schema(statement, "statement rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl WordCountStore for InMemoryWordCountStore {
    async fn drop_table(&self) -> Result<()> {
        self.check_schema(DROP_TABLE)?;
        *self.table.write().await = None;
        Ok(())
    }

    async fn create_table(&self) -> Result<()> {
        self.check_schema(CREATE_TABLE)?;
        let mut table = self.table.write().await;
        if table.is_none() {
            *table = Some(BTreeMap::new());
        }
        Ok(())
    }

    async fn upsert(&self, pair: &WordCount) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing_words.read().await.contains(&pair.word) {
            return Err(StoreError::write(&pair.word, "injected write failure"));
        }

        let mut table = self.table.write().await;
        let rows = table
            .as_mut()
            .ok_or_else(|| StoreError::write(&pair.word, format!("unconfigured table: {UPSERT}")))?;
        rows.insert(pair.word.clone(), pair.count);
        Ok(())
    }

    async fn get(&self, word: &str) -> Result<Option<WordCount>> {
        let table = self.table.read().await;
        let rows = table
            .as_ref()
            .ok_or_else(|| StoreError::Read("unconfigured table: example.wordcount".into()))?;
        Ok(rows.get(word).map(|count| WordCount::new(word, *count)))
    }

    async fn all(&self) -> Result<Vec<WordCount>> {
        let table = self.table.read().await;
        let rows = table
            .as_ref()
            .ok_or_else(|| StoreError::Read("unconfigured table: example.wordcount".into()))?;
        Ok(rows
            .iter()
            .map(|(word, count)| WordCount::new(word.clone(), *count))
            .collect())
    }
}
