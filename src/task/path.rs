// src/task/path.rs

//! `${var}` templating for output locations.
//!
//! Known variables are `basePath`, `year`, `month`, `day`, `hour`, `minute`
//! and `second` (zero-padded), plus anything added with
//! [`PathPattern::var`]. Unknown variables are left as-is.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDateTime, Timelike};
use regex::{Captures, Regex};

use crate::task::TaskContext;

pub const DEFAULT_PATTERN: &str = "${basePath}/${year}-${month}-${day}T${hour}_${minute}";

const DEFAULT_BASE_PATH: &str = "/tmp";

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("static pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    pattern: String,
    vars: HashMap<String, String>,
}

impl PathPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let mut vars = HashMap::new();
        vars.insert("basePath".to_string(), DEFAULT_BASE_PATH.to_string());
        Self {
            pattern: pattern.into(),
            vars,
        }
    }

    /// Pattern pre-filled from a node: its window start, the configured base
    /// path, `id` and `range`.
    pub fn for_context(pattern: impl Into<String>, ctx: &TaskContext) -> Self {
        Self::new(pattern)
            .base_path(ctx.base_path())
            .at(ctx.range().from())
            .var("id", ctx.id())
            .var("range", ctx.range().to_string())
    }

    pub fn base_path(self, base: impl AsRef<Path>) -> Self {
        let base = base.as_ref().to_string_lossy().into_owned();
        self.var("basePath", base)
    }

    /// Fill the date/time variables from `instant`.
    pub fn at(self, instant: NaiveDateTime) -> Self {
        self.var("year", format!("{:04}", instant.year()))
            .var("month", format!("{:02}", instant.month()))
            .var("day", format!("{:02}", instant.day()))
            .var("hour", format!("{:02}", instant.hour()))
            .var("minute", format!("{:02}", instant.minute()))
            .var("second", format!("{:02}", instant.second()))
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn render(&self) -> String {
        VAR_RE
            .replace_all(&self.pattern, |caps: &Captures<'_>| match self.vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl Default for PathPattern {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN)
    }
}
