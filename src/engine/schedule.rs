// src/engine/schedule.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::dag::{Failure, Node, ScheduleBuilder, StatusCode};
use crate::exec::{SchedulingResource, driver};
use crate::task::TaskContext;
use crate::time::TimeRange;

/// A started schedule: every node in scope has been submitted and will run
/// when its window closes and its dependencies are ready.
pub struct JobSchedule {
    range: TimeRange,
    target: Option<String>,
    nodes: Vec<Arc<Node>>,
    schedulers: Vec<Arc<dyn SchedulingResource>>,
    config: Arc<SchedulerConfig>,
}

impl JobSchedule {
    pub fn builder(range: TimeRange) -> ScheduleBuilder {
        ScheduleBuilder::new(range)
    }

    pub(crate) fn start(
        range: TimeRange,
        target: Option<String>,
        nodes: Vec<Arc<Node>>,
        schedulers: Vec<Arc<dyn SchedulingResource>>,
        config: Arc<SchedulerConfig>,
    ) -> Self {
        info!(range = %range, target = ?target, nodes = nodes.len(), "starting schedule");
        for node in &nodes {
            driver::submit(Arc::clone(node));
        }
        Self {
            range,
            target,
            nodes,
            schedulers,
            config,
        }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Nodes in scope, dependencies first.
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn scheduled_tasks(&self) -> Vec<TaskContext> {
        self.nodes.iter().map(Node::context).collect()
    }

    /// Ids in the order nodes were submitted. Advisory only; actual start
    /// order depends on windows and readiness.
    pub fn execution_order(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.key().to_string()).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.nodes.iter().all(|n| n.status().is_done())
    }

    /// Wait until every node is done, polling every `poll_interval`.
    pub async fn await_finish(&self) -> &Self {
        let interval = self.config.poll_interval();
        while !self.is_finished() {
            tokio::time::sleep(interval).await;
        }
        debug!(range = %self.range, "schedule finished");
        self
    }

    pub fn count(&self, code: StatusCode) -> usize {
        self.nodes.iter().filter(|n| n.status().code() == code).count()
    }

    pub fn summary(&self) -> BTreeMap<StatusCode, usize> {
        let mut summary = BTreeMap::new();
        for node in &self.nodes {
            *summary.entry(node.status().code()).or_insert(0) += 1;
        }
        summary
    }

    pub fn failed(&self) -> Vec<TaskContext> {
        self.nodes
            .iter()
            .filter(|n| n.status().has_failed())
            .map(Node::context)
            .collect()
    }

    /// Shut down every scheduling resource used by this schedule, each once.
    /// Pending timers are cancelled; running bodies are not interrupted.
    pub fn shutdown(&self) {
        for scheduler in &self.schedulers {
            scheduler.shutdown();
        }
    }

    /// Shut down and move every unfinished node to `ERROR_SIGTERM`.
    pub fn terminate(&self) {
        self.shutdown();
        let mut terminated = 0usize;
        for node in &self.nodes {
            if node.force(StatusCode::ErrorSigterm, Failure::Terminated) {
                terminated += 1;
            }
        }
        warn!(terminated, "schedule terminated");
    }
}
