// src/engine/pipeline.rs

use crate::errors::Result;
use crate::time::TimeRange;

/// Inputs of one pipeline invocation: the master range, an optional target
/// task id and free-form arguments passed through to task bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    pub range: TimeRange,
    pub target: Option<String>,
    pub args: Vec<String>,
}

impl PipelineContext {
    pub fn new(range: TimeRange) -> Self {
        Self {
            range,
            target: None,
            args: Vec::new(),
        }
    }

    pub fn parse(range: &str) -> Result<Self> {
        Ok(Self::new(TimeRange::parse(range)?))
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}
