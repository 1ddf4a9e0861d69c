// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod observer;
pub mod task;
pub mod time;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

pub use crate::config::SchedulerConfig;
pub use crate::dag::{Failure, Node, NodeKey, ScheduleBuilder, ScheduleGraph, StatusCode};
pub use crate::engine::{JobSchedule, PipelineContext};
pub use crate::errors::{Result as WindagResult, WindagError};
pub use crate::exec::{SchedulingResource, TokioScheduler};
pub use crate::observer::{JobObserver, LoggingObserver};
pub use crate::task::{
    BoxFuture, CommandTask, FileTokenOutput, OutputHandle, PathPattern, Task, TaskContext,
    TaskDefaults, TaskOutput,
};
pub use crate::time::{Granularity, TimeRange};

use crate::cli::CliArgs;
use crate::config::{PipelineFile, load_and_validate};

/// High-level entry point used by `main.rs`.
///
/// Loads the pipeline file, expands it over `--range` and runs it to
/// completion. Ctrl-C terminates the schedule. Fails if any node failed.
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading pipeline file '{}'", args.config))?;
    let ctx = PipelineContext::parse(&args.range)
        .with_context(|| format!("parsing --range '{}'", args.range))?
        .with_target(args.task.clone())
        .with_args(args.args.clone());

    let builder = pipeline_schedule(&cfg, ctx)?;

    if args.dry_run {
        print_dry_run(&builder.build())?;
        return Ok(());
    }

    let schedule = Arc::new(builder.observer(LoggingObserver).execute()?);

    // Ctrl-C → terminate every unfinished node.
    {
        let schedule = Arc::clone(&schedule);
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl-C received; terminating schedule");
            schedule.terminate();
        });
    }

    schedule.await_finish().await;
    schedule.shutdown();
    print_summary(&schedule);

    let failed = schedule.failed();
    if !failed.is_empty() {
        bail!("{} of {} node(s) failed", failed.len(), schedule.nodes().len());
    }
    info!("schedule completed");
    Ok(())
}

/// Declare every task of `cfg` on a builder for `ctx`.
///
/// Settings come from `[schedule]`, overridden by `WINDAG_*` environment
/// variables.
pub fn pipeline_schedule(cfg: &PipelineFile, ctx: PipelineContext) -> WindagResult<ScheduleBuilder> {
    let settings = cfg
        .schedule
        .clone()
        .with_overrides(|key| std::env::var(key).ok())?;
    let mut builder = ScheduleBuilder::from_context(ctx).config(settings);

    for id in cfg.declaration_order() {
        let Some(entry) = cfg.task.get(id) else {
            continue;
        };
        let mut task = CommandTask::new(entry.cmd.as_str());
        if let Some(pattern) = &entry.output {
            task = task.with_output(pattern.as_str());
        }
        if let Some(granularity) = entry.granularity {
            task = task.with_granularity(granularity);
        }
        builder = builder.task(task).id(id.as_str()).deps(entry.after.iter().cloned()).add()?;
    }

    Ok(builder)
}

/// Print the expanded graph without running anything.
fn print_dry_run(graph: &ScheduleGraph) -> WindagResult<()> {
    let planned = graph.plan()?;

    println!("windag dry-run");
    println!("  range = {}", graph.range());
    if let Some(target) = graph.target() {
        println!("  target = {target}");
    }
    println!(
        "  nodes = {} of {} ({} edges)",
        planned.len(),
        graph.nodes().len(),
        graph.edge_count()
    );
    println!();

    for node in &planned {
        println!("  - {node}");
        let deps = node.direct_dependencies();
        if !deps.is_empty() {
            println!("      after: {} node(s)", deps.len());
        }
        let ctx = node.context();
        if let Some(path) = ctx.output().handle().downcast_ref::<std::path::PathBuf>() {
            println!("      output: {}", path.display());
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}

fn print_summary(schedule: &JobSchedule) {
    println!("windag summary for {}", schedule.range());
    for (code, count) in schedule.summary() {
        println!("  {code}: {count}");
    }
    for ctx in schedule.failed() {
        let status = ctx.status();
        match status.failure {
            Some(failure) => println!("  failed {ctx}: {failure}"),
            None => println!("  failed {ctx}: {}", status.code),
        }
    }
}
