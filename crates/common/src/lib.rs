//! Shared types for the word-count job.

pub mod types;

pub use types::WordCount;
