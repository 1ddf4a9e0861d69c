// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only configuration problems surface as errors: anything that goes wrong
//! while a node runs is recorded on that node's status instead.

use thiserror::Error;

use crate::time::{Granularity, TimeRange};

#[derive(Error, Debug)]
pub enum WindagError {
    #[error("Could not parse time '{0}'")]
    InvalidTimeFormat(String),

    #[error("Invalid value in time '{token}': {reason}")]
    InvalidTimeValue { token: String, reason: String },

    #[error("Interval '{0}' has different granularities on each side")]
    MixedGranularity(String),

    #[error("Interval '{0}' is invalid, 'from' is after 'to'")]
    ReversedRange(String),

    #[error("Dependency does not exist: {0}")]
    MissingDependency(String),

    #[error(
        "Task '{task}' at {granularity} granularity does not fit in {master}: time range too short, will never complete"
    )]
    RangeTooShort {
        task: String,
        granularity: Granularity,
        master: TimeRange,
    },

    #[error("Node [{id}, {range}] already exists")]
    DuplicateNode { id: String, range: TimeRange },

    #[error("Task has no id; set one explicitly or provide a default")]
    MissingTaskId,

    #[error("Target task not found: {0}")]
    UnknownTarget(String),

    #[error("No Tokio runtime available to schedule on")]
    NoRuntime,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WindagError>;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
