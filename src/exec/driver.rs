// src/exec/driver.rs

//! Per-node execution attempts.
//!
//! A node is submitted once: it moves to `SCHEDULED` and its first attempt is
//! armed to fire when its window closes. Each attempt checks the direct
//! dependencies and either settles the node, runs it, or re-arms itself after
//! the retry backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, trace, warn};

use crate::dag::{Failure, Node, StatusCode};
use crate::errors::panic_message;
use crate::task::BoxFuture;

enum Gate {
    /// Every direct dependency is done with output.
    Open,
    /// Not decidable yet; try again after the backoff.
    Wait,
    /// The node was moved to a terminal error state.
    Closed,
}

/// Move `node` to `SCHEDULED` and arm its first attempt at the end of its
/// window.
pub(crate) fn submit(node: Arc<Node>) {
    if !node.transition(StatusCode::Scheduled, None) {
        debug!(node = %node, status = %node.status().code(), "node not scheduled");
        return;
    }

    let delay = until(node.range().to());
    trace!(node = %node, delay_ms = delay.as_millis() as u64, "armed window timer");
    let scheduler = Arc::clone(node.scheduler());
    scheduler.schedule(attempt(node), delay);
}

/// Time left until `instant`, read as local time. Zero if it has passed.
pub(crate) fn until(instant: NaiveDateTime) -> Duration {
    (instant - Local::now().naive_local())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

fn retry(node: Arc<Node>) {
    let backoff = node.config().retry_backoff();
    trace!(node = %node, backoff_ms = backoff.as_millis() as u64, "dependencies not ready; retrying");
    let scheduler = Arc::clone(node.scheduler());
    scheduler.schedule(attempt(node), backoff);
}

fn attempt(node: Arc<Node>) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        if node.status().is_done() {
            return;
        }
        match gate(&node) {
            Gate::Open => run(node).await,
            Gate::Wait => retry(node),
            Gate::Closed => {}
        }
    })
}

fn gate(node: &Arc<Node>) -> Gate {
    let deps = node.direct_dependencies();
    let all_done = deps.iter().all(|dep| dep.status().is_done());

    for dep in deps {
        let code = dep.status().code();
        if code.has_failed() {
            info!(node = %node, dependency = %dep, status = %code, "dependency failed");
            node.transition(
                StatusCode::ErrorDependency,
                Some(Failure::Dependency(dep.key().clone())),
            );
            return Gate::Closed;
        }
        if !code.is_done() {
            return Gate::Wait;
        }
        if !dep.has_output() {
            if !all_done {
                return Gate::Wait;
            }
            info!(node = %node, dependency = %dep, "dependency finished without output");
            node.transition(
                StatusCode::ErrorNoInput,
                Some(Failure::NoInput(dep.key().clone())),
            );
            return Gate::Closed;
        }
    }

    Gate::Open
}

async fn run(node: Arc<Node>) {
    if node.has_output() {
        if node.transition(StatusCode::Skipped, None) {
            info!(node = %node, "output exists; skipped");
        }
        return;
    }

    if !node.transition(StatusCode::Running, None) {
        return;
    }

    info!(node = %node, "running task");
    let started = Instant::now();
    let task = Arc::clone(node.task());
    let ctx = node.context();

    // Spawned so a panicking body is reported as a JoinError.
    let outcome = tokio::spawn(async move { task.execute(&ctx).await }).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(())) => {
            if node.transition(StatusCode::Finished, None) {
                info!(node = %node, elapsed_ms, "task finished");
            }
        }
        Ok(Err(err)) => {
            warn!(node = %node, elapsed_ms, error = %format!("{err:#}"), "task failed");
            node.transition(StatusCode::ErrorExecute, Some(Failure::Execute(Arc::new(err))));
        }
        Err(join_err) => {
            let err = if join_err.is_panic() {
                anyhow!("task panicked: {}", panic_message(join_err.into_panic().as_ref()))
            } else {
                anyhow!("task was cancelled")
            };
            warn!(node = %node, elapsed_ms, error = %err, "task aborted");
            node.transition(StatusCode::ErrorExecute, Some(Failure::Execute(Arc::new(err))));
        }
    }
}
