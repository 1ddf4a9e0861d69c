// src/dag/mod.rs

//! The expanded task graph.
//!
//! - [`builder`] declares tasks and expands them into nodes.
//! - [`node`] holds one (task, sub-interval) pair and its dependencies.
//! - [`status`] is the per-node state machine consulted by the driver.
//! - [`planner`] restricts the graph to a target and orders it.

pub mod builder;
pub mod node;
pub mod planner;
pub mod status;

pub use builder::{ScheduleBuilder, ScheduleGraph, TaskBuilder};
pub use node::{Node, NodeKey};
pub use status::{Failure, StatusCode, StatusSnapshot, TaskStatus};
