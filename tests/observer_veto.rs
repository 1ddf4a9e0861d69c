// tests/observer_veto.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use windag::{Failure, JobSchedule, StatusCode, TaskContext, TimeRange};
use windag_test_utils::builders::{ExecutionLog, OutputStore, RecordingTask};
use windag_test_utils::{fast_config, init_tracing, with_timeout};

fn range() -> TimeRange {
    TimeRange::parse("2015-10-11T10").unwrap()
}

#[tokio::test]
async fn observer_sees_every_transition_in_order() {
    init_tracing();
    let store = OutputStore::new();
    let log = ExecutionLog::new();
    let seen: Arc<Mutex<Vec<(String, StatusCode)>>> = Arc::default();

    let recorder = Arc::clone(&seen);
    let schedule = JobSchedule::builder(range())
        .config(fast_config())
        .observer(move |ctx: &TaskContext, next: StatusCode| -> anyhow::Result<bool> {
            recorder.lock().unwrap().push((ctx.id().to_string(), next));
            Ok(true)
        })
        .task(RecordingTask::new(&store, &log))
        .id("a")
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ("a".to_string(), StatusCode::Scheduled),
            ("a".to_string(), StatusCode::Running),
            ("a".to_string(), StatusCode::Finished),
        ]
    );
}

#[tokio::test]
async fn vetoing_scheduled_aborts_and_never_runs() {
    let store = OutputStore::new();
    let log = ExecutionLog::new();
    let aborted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&aborted);
    let schedule = JobSchedule::builder(range())
        .config(fast_config())
        .observer(move |ctx: &TaskContext, next: StatusCode| -> anyhow::Result<bool> {
            if next == StatusCode::ErrorAborted {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(!(ctx.id() == "a" && next == StatusCode::Scheduled))
        })
        .task(RecordingTask::new(&store, &log))
        .id("a")
        .add()
        .unwrap()
        .task(RecordingTask::new(&store, &log))
        .id("b")
        .deps(["a"])
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;

    assert_eq!(schedule.count(StatusCode::ErrorAborted), 1);
    assert_eq!(schedule.count(StatusCode::ErrorDependency), 1);
    assert_eq!(aborted.load(Ordering::SeqCst), 1);
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn observer_error_is_treated_as_veto() {
    let store = OutputStore::new();
    let log = ExecutionLog::new();

    let schedule = JobSchedule::builder(range())
        .config(fast_config())
        .observer(|_: &TaskContext, next: StatusCode| -> anyhow::Result<bool> {
            if next == StatusCode::Running {
                bail!("not today");
            }
            Ok(true)
        })
        .task(RecordingTask::new(&store, &log))
        .id("a")
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;

    let status = schedule.scheduled_tasks()[0].status();
    assert_eq!(status.code, StatusCode::ErrorAborted);
    assert!(matches!(status.failure, Some(Failure::Aborted(ref msg)) if msg.contains("not today")));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn observer_panic_is_treated_as_veto() {
    let store = OutputStore::new();
    let log = ExecutionLog::new();

    let schedule = JobSchedule::builder(range())
        .config(fast_config())
        .observer(|_: &TaskContext, next: StatusCode| -> anyhow::Result<bool> {
            if next == StatusCode::Finished {
                panic!("observer blew up");
            }
            Ok(true)
        })
        .task(RecordingTask::new(&store, &log))
        .id("a")
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;

    // The body ran, but the final transition was vetoed.
    assert_eq!(log.started_count("a"), 1);
    let status = schedule.scheduled_tasks()[0].status();
    assert_eq!(status.code, StatusCode::ErrorAborted);
    assert!(status.failure.unwrap().to_string().contains("observer blew up"));
}

#[tokio::test]
async fn done_status_rejects_later_changes() {
    let store = OutputStore::new();
    let log = ExecutionLog::new();

    let schedule = JobSchedule::builder(range())
        .config(fast_config())
        .task(RecordingTask::new(&store, &log))
        .id("a")
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;
    let before = schedule.scheduled_tasks()[0].status();

    schedule.terminate();

    let after = schedule.scheduled_tasks()[0].status();
    assert_eq!(after.code, StatusCode::Finished);
    assert_eq!(after.last_update, before.last_update);
    assert_eq!(schedule.count(StatusCode::ErrorSigterm), 0);
}
