// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `windag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "windag",
    version,
    about = "Run a pipeline of time-windowed tasks over a time range.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the pipeline file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Pipeline.toml")]
    pub config: String,

    /// Master time range, e.g. `2015-10-11`, `2015-W12` or
    /// `2015-10-11T10/2015-10-11T14`.
    #[arg(long, value_name = "RANGE")]
    pub range: String,

    /// Run only this task and its transitive dependencies.
    #[arg(long, value_name = "ID")]
    pub task: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WINDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Expand and print the node graph without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Extra arguments passed through to every task.
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
