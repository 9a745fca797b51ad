//! Batch processing over many stars

mod orchestrator;

pub use orchestrator::{run, PipelineResult};
