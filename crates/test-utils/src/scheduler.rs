#![allow(dead_code)]

//! Scheduling resource wrapper that counts what goes through it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use windag::{BoxFuture, SchedulingResource, TokioScheduler};

#[derive(Debug)]
pub struct CountingScheduler {
    inner: TokioScheduler,
    scheduled: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl CountingScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            inner: TokioScheduler::with_workers(workers),
            scheduled: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Pieces of work submitted, including retries.
    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl SchedulingResource for CountingScheduler {
    fn schedule(&self, work: BoxFuture<'static, ()>, delay: Duration) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
        self.inner.schedule(work, delay);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.inner.shutdown();
    }
}
