// src/config/model.rs

//! Configuration data model.
//!
//! A pipeline file looks like:
//!
//! ```toml
//! [schedule]
//! base_path = "/data/pipeline"
//! retry_backoff_ms = 500
//!
//! [task.import]
//! cmd = "fetch --hour ${year}${month}${day}${hour} > ${output}/data"
//! granularity = "hour"
//!
//! [task.report]
//! cmd = "build-report $WINDAG_DEPENDENCY_OUTPUTS"
//! granularity = "day"
//! after = ["import"]
//! output = "${basePath}/reports/${year}-${month}-${day}"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{Result, WindagError};
use crate::time::Granularity;

pub const ENV_BASE_PATH: &str = "WINDAG_BASE_PATH";
pub const ENV_RETRY_BACKOFF_MS: &str = "WINDAG_RETRY_BACKOFF_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "WINDAG_POLL_INTERVAL_MS";
pub const ENV_WORKERS: &str = "WINDAG_WORKERS";

/// Schedule-wide settings shared by every node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Root for output tokens.
    pub base_path: PathBuf,
    /// Delay before re-checking dependencies that are not ready yet.
    pub retry_backoff_ms: u64,
    /// How often `await_finish` re-checks completion.
    pub poll_interval_ms: u64,
    /// Size of the default scheduler's worker pool.
    pub workers: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/tmp"),
            retry_backoff_ms: 1000,
            poll_interval_ms: 100,
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl SchedulerConfig {
    /// Defaults overridden by `WINDAG_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps an env var name to its value.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup(ENV_BASE_PATH) {
            self.base_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_RETRY_BACKOFF_MS) {
            self.retry_backoff_ms = parse_number(ENV_RETRY_BACKOFF_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_number(ENV_POLL_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_WORKERS) {
            self.workers = parse_number(ENV_WORKERS, &value)?;
        }
        Ok(self)
    }

    pub fn with_base_path(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        WindagError::ConfigError(format!("{key} must be a non-negative integer (got '{value}')"))
    })
}

/// One `[task.<id>]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskEntry {
    /// Shell command; `${var}` placeholders are substituted per node.
    pub cmd: String,
    /// Defaults to `hour`.
    #[serde(default)]
    pub granularity: Option<Granularity>,
    /// Ids of tasks this one depends on.
    #[serde(default)]
    pub after: Vec<String>,
    /// Output token pattern; defaults to `<base_path>/tasks/<id>/<range>`.
    #[serde(default)]
    pub output: Option<String>,
}

/// The file as deserialized, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPipelineFile {
    #[serde(default)]
    pub schedule: SchedulerConfig,
    #[serde(default)]
    pub task: BTreeMap<String, TaskEntry>,
}

/// A validated pipeline: dependencies exist and are acyclic.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    pub schedule: SchedulerConfig,
    pub task: BTreeMap<String, TaskEntry>,
    order: Vec<String>,
}

impl PipelineFile {
    pub(crate) fn new_unchecked(
        schedule: SchedulerConfig,
        task: BTreeMap<String, TaskEntry>,
        order: Vec<String>,
    ) -> Self {
        Self {
            schedule,
            task,
            order,
        }
    }

    /// Task ids with every dependency before its dependents.
    pub fn declaration_order(&self) -> &[String] {
        &self.order
    }
}
