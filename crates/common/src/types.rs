use serde::{Deserialize, Serialize};

/// A word together with the number of times it has been seen.
///
/// This is both the element the pipeline emits and the row persisted in
/// `example.wordcount`. Rows are identified by `word` alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: i64,
}

impl WordCount {
    /// Creates a new pair.
    pub fn new(word: impl Into<String>, count: i64) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }

    /// The token element `(word, 1)` fed into the keyed sum.
    pub fn single(word: impl Into<String>) -> Self {
        Self::new(word, 1)
    }
}

impl std::fmt::Display for WordCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.word, self.count)
    }
}

impl From<(String, i64)> for WordCount {
    fn from((word, count): (String, i64)) -> Self {
        Self { word, count }
    }
}

impl From<WordCount> for (String, i64) {
    fn from(pair: WordCount) -> Self {
        (pair.word, pair.count)
    }
}
