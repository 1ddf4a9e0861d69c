// src/dag/builder.rs

//! Fluent construction of the expanded task graph.
//!
//! Each `task(..).add()` call validates the declaration against what has been
//! declared so far: dependency ids must already exist, the task granularity
//! must fit into the master range and no `(id, range)` pair may repeat. Nodes
//! are materialized by [`ScheduleBuilder::build`] once schedule-wide settings
//! are final.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::SchedulerConfig;
use crate::dag::node::{Node, NodeKey};
use crate::dag::planner;
use crate::dag::status::TaskStatus;
use crate::engine::{JobSchedule, PipelineContext};
use crate::errors::{Result, WindagError};
use crate::exec::{SchedulingResource, TokioScheduler};
use crate::observer::JobObserver;
use crate::task::Task;
use crate::time::{Granularity, TimeRange};

struct Declaration {
    id: String,
    task: Arc<dyn Task>,
    deps: Vec<String>,
    ranges: Vec<TimeRange>,
    scheduler: Option<Arc<dyn SchedulingResource>>,
}

pub struct ScheduleBuilder {
    range: TimeRange,
    target: Option<String>,
    args: Vec<String>,
    config: SchedulerConfig,
    observer: Option<Arc<dyn JobObserver>>,
    scheduler: Option<Arc<dyn SchedulingResource>>,
    declarations: Vec<Declaration>,
    keys: HashSet<NodeKey>,
    known_ids: HashSet<String>,
}

impl ScheduleBuilder {
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            target: None,
            args: Vec::new(),
            config: SchedulerConfig::default(),
            observer: None,
            scheduler: None,
            declarations: Vec::new(),
            keys: HashSet::new(),
            known_ids: HashSet::new(),
        }
    }

    pub fn parse(range: &str) -> Result<Self> {
        Ok(Self::new(TimeRange::parse(range)?))
    }

    pub fn from_context(ctx: PipelineContext) -> Self {
        let mut builder = Self::new(ctx.range).args(ctx.args);
        builder.target = ctx.target;
        builder
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Restrict execution to nodes of `id` and their transitive dependencies.
    pub fn target(mut self, id: impl Into<String>) -> Self {
        self.target = Some(id.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(self, observer: impl JobObserver + 'static) -> Self {
        self.shared_observer(Arc::new(observer))
    }

    pub fn shared_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Scheduler used by tasks that do not set their own. Defaults to a
    /// [`TokioScheduler`] sized by `config.workers`.
    pub fn scheduler(mut self, scheduler: Arc<dyn SchedulingResource>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn task(self, task: impl Task + 'static) -> TaskBuilder {
        self.shared_task(Arc::new(task))
    }

    pub fn shared_task(self, task: Arc<dyn Task>) -> TaskBuilder {
        let defaults = task.defaults();
        TaskBuilder {
            schedule: self,
            task,
            id: defaults.id,
            granularity: defaults.granularity,
            deps: Vec::new(),
            scheduler: None,
        }
    }

    /// Number of nodes declared so far.
    pub fn node_count(&self) -> usize {
        self.keys.len()
    }

    fn declare(
        &mut self,
        task: Arc<dyn Task>,
        id: Option<String>,
        granularity: Granularity,
        deps: Vec<String>,
        scheduler: Option<Arc<dyn SchedulingResource>>,
    ) -> Result<()> {
        let id = id.ok_or(WindagError::MissingTaskId)?;

        if let Some(missing) = deps.iter().find(|dep| !self.known_ids.contains(*dep)) {
            return Err(WindagError::MissingDependency(missing.clone()));
        }

        let ranges = granularity.ranges(&self.range);
        if ranges.is_empty() {
            return Err(WindagError::RangeTooShort {
                task: id,
                granularity,
                master: self.range,
            });
        }

        let keys: Vec<NodeKey> = ranges.iter().map(|r| NodeKey::new(id.as_str(), *r)).collect();
        if let Some(dup) = keys.iter().find(|key| self.keys.contains(*key)) {
            return Err(WindagError::DuplicateNode {
                id: dup.id.clone(),
                range: dup.range,
            });
        }

        debug!(
            task = %id,
            granularity = %granularity,
            nodes = ranges.len(),
            deps = ?deps,
            "declared task"
        );

        self.keys.extend(keys);
        self.known_ids.insert(id.clone());
        self.declarations.push(Declaration {
            id,
            task,
            deps,
            ranges,
            scheduler,
        });
        Ok(())
    }

    /// Materialize every declared node.
    ///
    /// Nodes are listed in declaration order and every node depends on all
    /// nodes of each id it names.
    pub fn build(self) -> ScheduleGraph {
        let config = Arc::new(self.config);
        let args: Arc<[String]> = self.args.into();
        let default_scheduler: Arc<dyn SchedulingResource> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioScheduler::with_workers(config.workers)),
        };

        let mut schedulers: Vec<Arc<dyn SchedulingResource>> = vec![Arc::clone(&default_scheduler)];
        let mut by_id: HashMap<String, Vec<Arc<Node>>> = HashMap::new();
        let mut nodes = Vec::with_capacity(self.keys.len());

        for decl in self.declarations {
            let deps: Arc<[Arc<Node>]> = decl
                .deps
                .iter()
                .flat_map(|dep| by_id.get(dep).into_iter().flatten().cloned())
                .collect();

            let scheduler = match decl.scheduler {
                Some(scheduler) => {
                    if !schedulers.iter().any(|s| Arc::ptr_eq(s, &scheduler)) {
                        schedulers.push(Arc::clone(&scheduler));
                    }
                    scheduler
                }
                None => Arc::clone(&default_scheduler),
            };

            for range in decl.ranges {
                let node = Arc::new(Node::new(
                    NodeKey::new(decl.id.as_str(), range),
                    Arc::clone(&decl.task),
                    Arc::clone(&deps),
                    TaskStatus::new(self.observer.clone()),
                    Arc::clone(&scheduler),
                    Arc::clone(&args),
                    Arc::clone(&config),
                ));
                by_id.entry(decl.id.clone()).or_default().push(Arc::clone(&node));
                nodes.push(node);
            }
        }

        ScheduleGraph {
            range: self.range,
            target: self.target,
            nodes,
            schedulers,
            config,
        }
    }

    /// Build the graph and start it. See [`ScheduleGraph::execute`].
    pub fn execute(self) -> Result<JobSchedule> {
        self.build().execute()
    }
}

/// Declaration of one task, finished with [`TaskBuilder::add`].
pub struct TaskBuilder {
    schedule: ScheduleBuilder,
    task: Arc<dyn Task>,
    id: Option<String>,
    granularity: Granularity,
    deps: Vec<String>,
    scheduler: Option<Arc<dyn SchedulingResource>>,
}

impl TaskBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Ids of already-declared tasks this task depends on. Repeated ids are
    /// kept once.
    pub fn deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.deps.contains(&dep) {
                self.deps.push(dep);
            }
        }
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn SchedulingResource>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn add(self) -> Result<ScheduleBuilder> {
        let mut schedule = self.schedule;
        schedule.declare(self.task, self.id, self.granularity, self.deps, self.scheduler)?;
        Ok(schedule)
    }
}

/// The fully expanded graph, not yet started.
pub struct ScheduleGraph {
    range: TimeRange,
    target: Option<String>,
    nodes: Vec<Arc<Node>>,
    schedulers: Vec<Arc<dyn SchedulingResource>>,
    config: Arc<SchedulerConfig>,
}

impl ScheduleGraph {
    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Every node, in declaration order.
    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.direct_dependencies().len()).sum()
    }

    /// Nodes that would be scheduled, dependencies first.
    pub fn plan(&self) -> Result<Vec<Arc<Node>>> {
        planner::plan(&self.nodes, self.target.as_deref())
    }

    /// Submit every planned node and return the running schedule.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn execute(self) -> Result<JobSchedule> {
        tokio::runtime::Handle::try_current().map_err(|_| WindagError::NoRuntime)?;
        let scope = self.plan()?;
        Ok(JobSchedule::start(
            self.range,
            self.target,
            scope,
            self.schedulers,
            self.config,
        ))
    }
}
