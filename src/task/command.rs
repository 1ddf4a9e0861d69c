// src/task/command.rs

//! Task that runs an external shell command once per node.
//!
//! The command line is templated with the same variables as
//! [`PathPattern`] plus `${id}`, `${range}`, `${output}` and `${args}`. The
//! child process also sees them as environment variables:
//!
//! - `WINDAG_TASK_ID`, `WINDAG_RANGE`
//! - `WINDAG_OUTPUT`: the output directory of this node, created before
//!   the command starts
//! - `WINDAG_DEPENDENCY_OUTPUTS`: token paths of the direct dependencies,
//!   joined like `PATH`
//!
//! A zero exit status writes the success marker into the output directory;
//! anything else fails the node and leaves the output incomplete.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::task::{BoxFuture, FileTokenOutput, PathPattern, Task, TaskContext, TaskDefaults, TaskOutput};
use crate::time::Granularity;

#[derive(Debug, Clone)]
pub struct CommandTask {
    cmd: String,
    output_pattern: Option<String>,
    defaults: TaskDefaults,
}

impl CommandTask {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            output_pattern: None,
            defaults: TaskDefaults::default(),
        }
    }

    /// Use a `${var}` pattern for the output directory instead of
    /// [`TaskContext::token_path`].
    pub fn with_output(mut self, pattern: impl Into<String>) -> Self {
        self.output_pattern = Some(pattern.into());
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.defaults.granularity = granularity;
        self
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn output_path(&self, ctx: &TaskContext) -> PathBuf {
        match &self.output_pattern {
            Some(pattern) => PathBuf::from(PathPattern::for_context(pattern.as_str(), ctx).render()),
            None => ctx.token_path(),
        }
    }

    /// The command line after substitution.
    pub fn render(&self, ctx: &TaskContext) -> String {
        let output = self.output_path(ctx);
        PathPattern::for_context(self.cmd.as_str(), ctx)
            .var("output", output.to_string_lossy())
            .var("args", ctx.args().join(" "))
            .render()
    }

    async fn run(&self, ctx: &TaskContext) -> anyhow::Result<()> {
        let line = self.render(ctx);
        let output = FileTokenOutput::new(self.output_path(ctx));
        let dependency_outputs = dependency_paths(ctx);

        output
            .prepare()
            .with_context(|| format!("creating output directory {}", output.path().display()))?;

        info!(task = %ctx.id(), range = %ctx.range(), cmd = %line, "starting task process");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&line);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&line);
            c
        };

        cmd.env("WINDAG_TASK_ID", ctx.id())
            .env("WINDAG_RANGE", ctx.range().to_string())
            .env("WINDAG_OUTPUT", output.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match std::env::join_paths(&dependency_outputs) {
            Ok(joined) => {
                cmd.env("WINDAG_DEPENDENCY_OUTPUTS", joined);
            }
            Err(err) => {
                warn!(task = %ctx.id(), error = %err, "cannot export dependency outputs");
            }
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process for task '{}'", ctx.key()))?;

        // Always consume both pipes so buffers don't fill.
        if let Some(stdout) = child.stdout.take() {
            let key = ctx.key().to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(task = %key, "stdout: {}", line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let key = ctx.key().to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %key, "stderr: {}", line);
                }
            });
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process of task '{}'", ctx.key()))?;
        let code = status.code().unwrap_or(-1);

        info!(
            task = %ctx.id(),
            range = %ctx.range(),
            exit_code = code,
            success = status.success(),
            "task process exited"
        );

        if !status.success() {
            bail!("command for '{}' exited with status {code}", ctx.key());
        }

        output
            .create()
            .with_context(|| format!("marking output {} complete", output.path().display()))?;
        Ok(())
    }
}

fn dependency_paths(ctx: &TaskContext) -> Vec<PathBuf> {
    ctx.dependency_outputs()
        .iter()
        .filter_map(|output| output.handle().downcast_ref::<PathBuf>().cloned())
        .collect()
}

impl Task for CommandTask {
    fn execute<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(self.run(ctx))
    }

    fn output(&self, ctx: &TaskContext) -> Box<dyn TaskOutput> {
        Box::new(FileTokenOutput::new(self.output_path(ctx)))
    }

    fn defaults(&self) -> TaskDefaults {
        self.defaults.clone()
    }
}
