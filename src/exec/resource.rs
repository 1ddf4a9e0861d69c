// src/exec/resource.rs

//! Where delayed node work runs.
//!
//! The driver never spawns directly: it hands a future and a delay to a
//! [`SchedulingResource`]. Nodes of different tasks may use different
//! resources, e.g. to cap the concurrency of an expensive task type.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Semaphore, watch};
use tracing::{debug, error, trace};

use crate::task::BoxFuture;

pub trait SchedulingResource: Send + Sync + fmt::Debug {
    /// Run `work` once `delay` has elapsed.
    ///
    /// Work submitted after [`shutdown`](Self::shutdown), or still waiting
    /// when it is called, is dropped without running.
    fn schedule(&self, work: BoxFuture<'static, ()>, delay: Duration);

    /// Stop accepting work and cancel pending timers. Idempotent.
    fn shutdown(&self);
}

/// Timer + worker pool on top of Tokio.
///
/// Each piece of work sleeps on the runtime timer, then takes one of
/// `workers` permits before it is polled.
#[derive(Debug)]
pub struct TokioScheduler {
    handle: Option<Handle>,
    permits: Arc<Semaphore>,
    workers: usize,
    shutdown: watch::Sender<bool>,
}

impl TokioScheduler {
    /// Pool with one worker per available CPU.
    pub fn new() -> Self {
        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
        Self::with_workers(workers)
    }

    /// Pool with `workers` concurrent slots, spawning onto the runtime that is
    /// current when work is scheduled.
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        let (shutdown, _) = watch::channel(false);
        Self {
            handle: None,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            shutdown,
        }
    }

    /// Spawn onto `handle` instead of the current runtime.
    pub fn on(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingResource for TokioScheduler {
    fn schedule(&self, work: BoxFuture<'static, ()>, delay: Duration) {
        if self.is_shutdown() {
            trace!("scheduler is shut down; dropping work");
            return;
        }

        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => match Handle::try_current() {
                Ok(handle) => handle,
                Err(err) => {
                    error!(error = %err, "no Tokio runtime to schedule work on; dropping it");
                    return;
                }
            },
        };

        let permits = Arc::clone(&self.permits);
        let mut shutdown_rx = self.shutdown.subscribe();

        handle.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.wait_for(|stopped| *stopped) => {
                    trace!("pending work cancelled by shutdown");
                    return;
                }
            }

            // The semaphore is closed on shutdown.
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            work.await;
        });
    }

    fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        self.permits.close();
        debug!(workers = self.workers, "scheduler shut down");
    }
}
