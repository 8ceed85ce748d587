//! Word-count stream and the sinks it feeds.
//!
//! - [`word_counts`] builds the `source -> flat_map -> key_by -> sum` stream
//! - [`Sink`] trait with a table sink and a console sink
//! - [`PipelineRunner`] drives a stream to completion and reports sink
//!   failures through a [`FailureHandler`]

pub mod error;
pub mod runner;
pub mod sink;
pub mod wordcount;

pub use error::{PipelineError, Result, SinkError};
pub use runner::{PipelineRunner, RunSummary, SinkPolicy};
pub use sink::{ConsoleSink, FailureHandler, Sink, StoreSink};
pub use wordcount::{SENTENCES, final_counts, tokenize, word_counts};
