// src/dag/node.rs

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::dag::status::{Failure, StatusCode, TaskStatus};
use crate::exec::SchedulingResource;
use crate::task::{Task, TaskContext};
use crate::time::TimeRange;

/// Identity of a node: the task id and the sub-interval it covers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub id: String,
    pub range: TimeRange,
}

impl NodeKey {
    pub fn new(id: impl Into<String>, range: TimeRange) -> Self {
        Self {
            id: id.into(),
            range,
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.id, self.range)
    }
}

/// One (task, sub-interval) pair in the expanded graph.
///
/// Nodes are immutable once built apart from their status, and only ever
/// point at nodes declared before them, so the graph is acyclic.
pub struct Node {
    key: NodeKey,
    task: Arc<dyn Task>,
    deps: Arc<[Arc<Node>]>,
    status: TaskStatus,
    scheduler: Arc<dyn SchedulingResource>,
    args: Arc<[String]>,
    config: Arc<SchedulerConfig>,
}

impl Node {
    pub(crate) fn new(
        key: NodeKey,
        task: Arc<dyn Task>,
        deps: Arc<[Arc<Node>]>,
        status: TaskStatus,
        scheduler: Arc<dyn SchedulingResource>,
        args: Arc<[String]>,
        config: Arc<SchedulerConfig>,
    ) -> Self {
        Self {
            key,
            task,
            deps,
            status,
            scheduler,
            args,
            config,
        }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.key.id
    }

    pub fn range(&self) -> TimeRange {
        self.key.range
    }

    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }

    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    pub fn scheduler(&self) -> &Arc<dyn SchedulingResource> {
        &self.scheduler
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn direct_dependencies(&self) -> &[Arc<Node>] {
        &self.deps
    }

    /// All transitive dependencies, breadth first, each once.
    pub fn dependencies(&self) -> Vec<Arc<Node>> {
        let mut queue: VecDeque<Arc<Node>> = self.deps.iter().cloned().collect();
        let mut seen: HashSet<NodeKey> = HashSet::new();
        let mut result = Vec::new();

        while let Some(node) = queue.pop_front() {
            if !seen.insert(node.key.clone()) {
                continue;
            }
            queue.extend(node.deps.iter().cloned());
            result.push(node);
        }

        result
    }

    pub fn context(self: &Arc<Self>) -> TaskContext {
        TaskContext::new(Arc::clone(self))
    }

    pub(crate) fn has_output(self: &Arc<Self>) -> bool {
        let ctx = self.context();
        self.task.output(&ctx).exists()
    }

    pub(crate) fn transition(self: &Arc<Self>, next: StatusCode, failure: Option<Failure>) -> bool {
        self.status.set_code(&self.context(), next, failure)
    }

    pub(crate) fn force(self: &Arc<Self>, code: StatusCode, failure: Failure) -> bool {
        self.status.force(&self.context(), code, failure)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("key", &self.key)
            .field("deps", &self.deps.len())
            .field("status", &self.status.code())
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}
