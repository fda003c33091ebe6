// file: src/pipeline/mod.rs
// description: pipeline module exports and public api
// reference: pipeline orchestration

mod indexer;
mod progress;

pub use indexer::Indexer;
pub use progress::{Outcome, PipelineStats, ProgressTracker};
