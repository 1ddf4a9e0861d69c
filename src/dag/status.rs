// src/dag/status.rs

//! Per-node status: a guarded state machine with an optional observer.
//!
//! Every transition is offered to the observer before it is committed. A veto,
//! an observer error or an observer panic turns the transition into
//! `ERROR_ABORTED`. Once a node is done (finished, skipped or failed) its
//! status never changes again.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::dag::NodeKey;
use crate::errors::panic_message;
use crate::observer::JobObserver;
use crate::task::TaskContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusCode {
    New,
    Scheduled,
    Running,
    Finished,
    Skipped,
    ErrorExecute,
    ErrorDependency,
    ErrorNoInput,
    ErrorAborted,
    ErrorSigterm,
}

impl StatusCode {
    pub const ALL: [StatusCode; 10] = [
        StatusCode::New,
        StatusCode::Scheduled,
        StatusCode::Running,
        StatusCode::Finished,
        StatusCode::Skipped,
        StatusCode::ErrorExecute,
        StatusCode::ErrorDependency,
        StatusCode::ErrorNoInput,
        StatusCode::ErrorAborted,
        StatusCode::ErrorSigterm,
    ];

    pub fn has_failed(self) -> bool {
        matches!(
            self,
            StatusCode::ErrorExecute
                | StatusCode::ErrorDependency
                | StatusCode::ErrorNoInput
                | StatusCode::ErrorAborted
                | StatusCode::ErrorSigterm
        )
    }

    pub fn is_done(self) -> bool {
        matches!(self, StatusCode::Finished | StatusCode::Skipped) || self.has_failed()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCode::New => "NEW",
            StatusCode::Scheduled => "SCHEDULED",
            StatusCode::Running => "RUNNING",
            StatusCode::Finished => "FINISHED",
            StatusCode::Skipped => "SKIPPED",
            StatusCode::ErrorExecute => "ERROR_EXECUTE",
            StatusCode::ErrorDependency => "ERROR_DEPENDENCY",
            StatusCode::ErrorNoInput => "ERROR_NO_INPUT",
            StatusCode::ErrorAborted => "ERROR_ABORTED",
            StatusCode::ErrorSigterm => "ERROR_SIGTERM",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a node ended up in an error state.
#[derive(Debug, Clone)]
pub enum Failure {
    /// The task body returned an error or panicked.
    Execute(Arc<anyhow::Error>),
    /// A direct dependency failed.
    Dependency(NodeKey),
    /// A direct dependency finished without producing output.
    NoInput(NodeKey),
    /// The observer vetoed, errored or panicked.
    Aborted(String),
    Terminated,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Execute(err) => write!(f, "execution failed: {err:#}"),
            Failure::Dependency(key) => write!(f, "dependency {key} failed"),
            Failure::NoInput(key) => write!(f, "dependency {key} produced no output"),
            Failure::Aborted(reason) => write!(f, "aborted: {reason}"),
            Failure::Terminated => f.write_str("terminated"),
        }
    }
}

/// Point-in-time copy of a node's status.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub code: StatusCode,
    pub last_update: DateTime<Utc>,
    pub failure: Option<Failure>,
}

pub struct TaskStatus {
    state: Mutex<StatusSnapshot>,
    observer: Option<Arc<dyn JobObserver>>,
}

impl TaskStatus {
    pub(crate) fn new(observer: Option<Arc<dyn JobObserver>>) -> Self {
        Self {
            state: Mutex::new(StatusSnapshot {
                code: StatusCode::New,
                last_update: Utc::now(),
                failure: None,
            }),
            observer,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatusSnapshot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn code(&self) -> StatusCode {
        self.lock().code
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().clone()
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.lock().last_update
    }

    pub fn failure(&self) -> Option<Failure> {
        self.lock().failure.clone()
    }

    pub fn is_done(&self) -> bool {
        self.code().is_done()
    }

    pub fn has_failed(&self) -> bool {
        self.code().has_failed()
    }

    /// Offer `next` to the observer, then commit it.
    ///
    /// Returns `true` iff `next` was committed. A done status rejects every
    /// transition without consulting the observer.
    pub(crate) fn set_code(
        &self,
        ctx: &TaskContext,
        next: StatusCode,
        failure: Option<Failure>,
    ) -> bool {
        let current = self.code();
        if current.is_done() {
            debug!(node = %ctx, current = %current, rejected = %next, "status already done");
            return false;
        }

        match self.offer(ctx, next) {
            Ok(true) => self.commit(next, failure),
            Ok(false) => {
                warn!(node = %ctx, status = %next, "observer rejected status change");
                self.abort(ctx, format!("observer rejected {next}"));
                false
            }
            Err(err) => {
                error!(node = %ctx, status = %next, error = %err, "observer failed");
                self.abort(ctx, err.to_string());
                false
            }
        }
    }

    /// Commit `code` without a veto, then notify the observer. Used for
    /// forced terminal states such as `ERROR_SIGTERM`.
    pub(crate) fn force(&self, ctx: &TaskContext, code: StatusCode, failure: Failure) -> bool {
        if !self.commit(code, Some(failure)) {
            return false;
        }
        if let Err(err) = self.offer(ctx, code) {
            warn!(node = %ctx, status = %code, error = %err, "observer failed on forced status");
        }
        true
    }

    fn offer(&self, ctx: &TaskContext, next: StatusCode) -> anyhow::Result<bool> {
        let Some(observer) = &self.observer else {
            return Ok(true);
        };
        match panic::catch_unwind(AssertUnwindSafe(|| observer.notify(ctx, next))) {
            Ok(verdict) => verdict,
            Err(payload) => Err(anyhow!("observer panicked: {}", panic_message(payload.as_ref()))),
        }
    }

    fn commit(&self, next: StatusCode, failure: Option<Failure>) -> bool {
        let mut state = self.lock();
        if state.code.is_done() {
            return false;
        }
        state.code = next;
        state.last_update = Utc::now();
        if failure.is_some() {
            state.failure = failure;
        }
        true
    }

    fn abort(&self, ctx: &TaskContext, reason: String) {
        if self.commit(StatusCode::ErrorAborted, Some(Failure::Aborted(reason))) {
            // The verdict on an abort is ignored.
            let _ = self.offer(ctx, StatusCode::ErrorAborted);
        }
    }
}

impl fmt::Debug for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStatus")
            .field("state", &*self.lock())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
