// src/observer.rs

//! Status-transition observers.
//!
//! An observer is offered every status change of every node before it is
//! committed, and may veto it. Observers run synchronously on the thread
//! driving the node, so they should be quick.

use tracing::info;

use crate::dag::StatusCode;
use crate::task::TaskContext;

pub trait JobObserver: Send + Sync {
    /// Called before `ctx` moves to `next`.
    ///
    /// `Ok(false)` vetoes the change; `Err` or a panic counts as a veto too.
    /// Either way the node is moved to `ERROR_ABORTED` instead, and the
    /// observer is told about that as well (its verdict on it is ignored).
    fn notify(&self, ctx: &TaskContext, next: StatusCode) -> anyhow::Result<bool>;
}

impl<F> JobObserver for F
where
    F: Fn(&TaskContext, StatusCode) -> anyhow::Result<bool> + Send + Sync,
{
    fn notify(&self, ctx: &TaskContext, next: StatusCode) -> anyhow::Result<bool> {
        self(ctx, next)
    }
}

/// Logs every transition and accepts all of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl JobObserver for LoggingObserver {
    fn notify(&self, ctx: &TaskContext, next: StatusCode) -> anyhow::Result<bool> {
        let from = ctx.status().code;
        info!(task = %ctx.id(), range = %ctx.range(), from = %from, to = %next, "status change");
        Ok(true)
    }
}
