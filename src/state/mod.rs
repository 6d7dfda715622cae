//! State module for tracking a collection run
//!
//! # Components
//!
//! - `RunPhase`: lifecycle of a run (idle, running, draining)
//! - `PipelineState`: the pending record buffer and its persisted cursor,
//!   shared between the run loop, the periodic flusher and the shutdown path

mod pipeline_state;
mod run_phase;

// Re-export main types
pub use pipeline_state::PipelineState;
pub use run_phase::RunPhase;
