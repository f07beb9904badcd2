//! Batch engine: per-group evaluation and the parallel orchestrator.

mod batch;
mod group;

pub use batch::{BatchOrchestrator, BatchOutput, EngineConfig, EngineError};
pub use group::{GroupOutput, process_group};
