#![allow(dead_code)]

//! Test tasks with in-memory outputs and an execution log.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::bail;
use windag::{
    BoxFuture, Granularity, NodeKey, OutputHandle, Task, TaskContext, TaskDefaults, TaskOutput,
};

/// Shared set of node keys whose output "exists".
#[derive(Debug, Clone, Default)]
pub struct OutputStore {
    inner: Arc<Mutex<HashSet<NodeKey>>>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: NodeKey) {
        self.inner.lock().unwrap().insert(key);
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.inner.lock().unwrap().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct MemoryOutput {
    store: OutputStore,
    key: NodeKey,
}

impl TaskOutput for MemoryOutput {
    fn exists(&self) -> bool {
        self.store.contains(&self.key)
    }

    fn handle(&self) -> OutputHandle {
        Arc::new(self.key.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(NodeKey),
    Finished(NodeKey),
}

/// Ordered record of task body starts and ends.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    inner: Arc<Mutex<Vec<Event>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.inner.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<NodeKey> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started(key) => Some(key),
                Event::Finished(_) => None,
            })
            .collect()
    }

    pub fn started_count(&self, id: &str) -> usize {
        self.started().iter().filter(|k| k.id == id).count()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Succeed,
    Fail,
    Panic,
    /// Succeed without creating output.
    NoOutput,
}

/// Task that logs its runs to an [`ExecutionLog`] and marks its output in an
/// [`OutputStore`].
#[derive(Debug, Clone)]
pub struct RecordingTask {
    store: OutputStore,
    log: ExecutionLog,
    behaviour: Behaviour,
    work: Duration,
    defaults: TaskDefaults,
}

impl RecordingTask {
    pub fn new(store: &OutputStore, log: &ExecutionLog) -> Self {
        Self {
            store: store.clone(),
            log: log.clone(),
            behaviour: Behaviour::Succeed,
            work: Duration::ZERO,
            defaults: TaskDefaults::default(),
        }
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.defaults.granularity = granularity;
        self
    }

    pub fn default_id(mut self, id: &str) -> Self {
        self.defaults.id = Some(id.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.behaviour = Behaviour::Fail;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.behaviour = Behaviour::Panic;
        self
    }

    pub fn without_output(mut self) -> Self {
        self.behaviour = Behaviour::NoOutput;
        self
    }

    /// Sleep this long inside the body.
    pub fn working_for(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    async fn run(&self, ctx: &TaskContext) -> anyhow::Result<()> {
        let key = ctx.key().clone();
        self.log.push(Event::Started(key.clone()));
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }

        let result = match self.behaviour {
            Behaviour::Succeed => {
                self.store.insert(key.clone());
                Ok(())
            }
            Behaviour::NoOutput => Ok(()),
            Behaviour::Fail => Err(anyhow::anyhow!("{key} failed on purpose")),
            Behaviour::Panic => panic!("{key} panicked on purpose"),
        };

        self.log.push(Event::Finished(key));
        result
    }
}

impl Task for RecordingTask {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.run(ctx))
    }

    fn output(&self, ctx: &TaskContext) -> Box<dyn TaskOutput> {
        Box::new(MemoryOutput {
            store: self.store.clone(),
            key: ctx.key().clone(),
        })
    }

    fn defaults(&self) -> TaskDefaults {
        self.defaults.clone()
    }
}

/// Task whose body must never run.
#[derive(Debug, Clone, Default)]
pub struct UnreachableTask {
    pub granularity: Option<Granularity>,
}

impl Task for UnreachableTask {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        let key = ctx.key().clone();
        Box::pin(async move { bail!("{key} should not have run") })
    }

    fn output(&self, ctx: &TaskContext) -> Box<dyn TaskOutput> {
        Box::new(MemoryOutput {
            store: OutputStore::new(),
            key: ctx.key().clone(),
        })
    }

    fn defaults(&self) -> TaskDefaults {
        TaskDefaults::new(self.granularity.unwrap_or(Granularity::Hour))
    }
}
