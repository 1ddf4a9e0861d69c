// src/task/mod.rs

//! The contract between the scheduler and task bodies.
//!
//! - [`Task`] is what a pipeline author implements: an async body plus an
//!   existence-checkable [`TaskOutput`].
//! - [`context`] holds the read-only [`TaskContext`] handed to bodies.
//! - [`output`] provides a filesystem-backed output token.
//! - [`path`] provides `${var}` path templating for output locations.
//! - [`command`] is a task that launches an external shell command.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::time::Granularity;

pub mod command;
pub mod context;
pub mod output;
pub mod path;

pub use command::CommandTask;
pub use context::TaskContext;
pub use output::{FileTokenOutput, SUCCESS_MARKER};
pub use path::PathPattern;

/// Boxed, sendable future used at the trait seams of the crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opaque value a task output hands to its dependents, e.g. a `PathBuf`.
pub type OutputHandle = Arc<dyn Any + Send + Sync>;

/// A unit of work that is expanded into one node per sub-interval of the
/// schedule's master range.
///
/// Tasks should be idempotent: a node whose output already exists is skipped
/// instead of executed.
pub trait Task: Send + Sync {
    /// Run the task body for the node described by `ctx`.
    ///
    /// Called only once every direct dependency has finished with output.
    /// Any error fails this node and every node that depends on it.
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Where this node's output lives, like a local directory or remote path.
    fn output(&self, ctx: &TaskContext) -> Box<dyn TaskOutput>;

    /// Id and granularity used when the schedule declaration omits them.
    fn defaults(&self) -> TaskDefaults {
        TaskDefaults::default()
    }
}

/// Existence-checkable result of a node.
pub trait TaskOutput: Send + Sync {
    /// Whether the output exists. This is the only readiness signal the
    /// scheduler consults.
    fn exists(&self) -> bool;

    /// The output itself, passed verbatim to dependents.
    fn handle(&self) -> OutputHandle;
}

/// Per-task-type defaults consulted by the graph builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefaults {
    pub id: Option<String>,
    pub granularity: Granularity,
}

impl TaskDefaults {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            id: None,
            granularity,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl Default for TaskDefaults {
    fn default() -> Self {
        Self::new(Granularity::Hour)
    }
}
