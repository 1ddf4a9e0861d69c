// src/task/context.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::dag::{Node, NodeKey, StatusSnapshot};
use crate::task::TaskOutput;
use crate::time::TimeRange;

/// Read-only view of one node, handed to task bodies and observers.
///
/// Cheap to clone; it only holds a reference to the node.
#[derive(Clone)]
pub struct TaskContext {
    node: Arc<Node>,
}

impl TaskContext {
    pub(crate) fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    pub fn id(&self) -> &str {
        self.node.id()
    }

    pub fn range(&self) -> TimeRange {
        self.node.range()
    }

    pub fn key(&self) -> &NodeKey {
        self.node.key()
    }

    /// Free-form arguments the schedule was created with.
    pub fn args(&self) -> &[String] {
        self.node.args()
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.node.config()
    }

    pub fn base_path(&self) -> &Path {
        &self.node.config().base_path
    }

    pub fn status(&self) -> StatusSnapshot {
        self.node.status().snapshot()
    }

    pub fn output(&self) -> Box<dyn TaskOutput> {
        self.node.task().output(self)
    }

    pub fn dependency_keys(&self) -> Vec<NodeKey> {
        self.node
            .direct_dependencies()
            .iter()
            .map(|dep| dep.key().clone())
            .collect()
    }

    /// Outputs of the direct dependencies, in declaration order.
    pub fn dependency_outputs(&self) -> Vec<Box<dyn TaskOutput>> {
        self.node
            .direct_dependencies()
            .iter()
            .map(|dep| dep.context().output())
            .collect()
    }

    /// Conventional token location: `<base_path>/tasks/<id>/<range>`.
    pub fn token_path(&self) -> PathBuf {
        self.base_path()
            .join("tasks")
            .join(self.id())
            .join(self.range().to_string())
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("key", self.key())
            .field("status", &self.node.status().code())
            .finish()
    }
}

impl fmt::Display for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.key(), f)
    }
}
