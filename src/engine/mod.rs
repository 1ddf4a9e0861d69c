// src/engine/mod.rs

//! Orchestration of a running schedule.
//!
//! - [`pipeline`] holds the inputs of one invocation.
//! - [`schedule`] owns the started nodes: completion, counts, shutdown.

pub mod pipeline;
pub mod schedule;

pub use pipeline::PipelineContext;
pub use schedule::JobSchedule;
