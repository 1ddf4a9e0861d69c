// src/exec/mod.rs

//! Execution layer.
//!
//! - [`resource`] provides the `SchedulingResource` trait and the default
//!   Tokio-backed `TokioScheduler`.
//! - [`driver`] runs one attempt of a node: the dependency gate, the
//!   idempotency check and the task body.

pub mod driver;
pub mod resource;

pub use resource::{SchedulingResource, TokioScheduler};
