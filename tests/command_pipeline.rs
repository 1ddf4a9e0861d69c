// tests/command_pipeline.rs
#![cfg(unix)]

use std::fs;
use std::time::Duration;

use windag::config::SchedulerConfig;
use windag::task::SUCCESS_MARKER;
use windag::{CommandTask, Granularity, JobSchedule, StatusCode, TimeRange};
use windag_test_utils::{init_tracing, with_timeout};

fn config(base: &std::path::Path) -> SchedulerConfig {
    SchedulerConfig::default()
        .with_base_path(base)
        .with_retry_backoff(Duration::from_millis(10))
        .with_poll_interval(Duration::from_millis(10))
        .with_workers(4)
}

#[tokio::test]
async fn commands_run_once_and_create_tokens() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("runs.txt");

    let hourly = CommandTask::new(format!(
        "echo \"$WINDAG_TASK_ID ${{year}}${{month}}${{day}}T${{hour}}\" >> {}",
        marker.display()
    ))
    .with_granularity(Granularity::Hour);
    let daily = CommandTask::new("test -d \"$(echo $WINDAG_DEPENDENCY_OUTPUTS | cut -d: -f1)\"")
        .with_granularity(Granularity::Day)
        .with_output("${basePath}/daily/${year}-${month}-${day}");

    let build = || {
        JobSchedule::builder(TimeRange::parse("2015-10-11").unwrap())
            .config(config(dir.path()))
            .task(hourly.clone())
            .id("hourly")
            .add()
            .unwrap()
            .task(daily.clone())
            .id("daily")
            .deps(["hourly"])
            .add()
            .unwrap()
    };

    let schedule = build().execute().unwrap();
    with_timeout(schedule.await_finish()).await;
    schedule.shutdown();

    assert_eq!(schedule.count(StatusCode::Finished), 25, "{:?}", schedule.summary());
    assert!(dir.path().join("tasks/hourly/2015-10-11T00").join(SUCCESS_MARKER).is_file());
    assert!(dir.path().join("daily/2015-10-11").join(SUCCESS_MARKER).is_file());

    let runs = fs::read_to_string(&marker).unwrap();
    assert_eq!(runs.lines().count(), 24);
    assert!(runs.lines().any(|l| l == "hourly 20151011T13"));

    // A second run finds every token and skips.
    let schedule = build().execute().unwrap();
    with_timeout(schedule.await_finish()).await;
    assert_eq!(schedule.count(StatusCode::Skipped), 25);
    assert_eq!(fs::read_to_string(&marker).unwrap().lines().count(), 24);
}

#[tokio::test]
async fn non_zero_exit_fails_the_node() {
    let dir = tempfile::tempdir().unwrap();

    let schedule = JobSchedule::builder(TimeRange::parse("2015-10-11T10").unwrap())
        .config(config(dir.path()))
        .task(CommandTask::new("exit 3"))
        .id("broken")
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;

    let status = schedule.scheduled_tasks()[0].status();
    assert_eq!(status.code, StatusCode::ErrorExecute);
    assert!(status.failure.unwrap().to_string().contains("status 3"));
    assert!(!dir.path().join("tasks/broken/2015-10-11T10").join(SUCCESS_MARKER).exists());
}

#[tokio::test]
async fn args_and_output_are_substituted() {
    let dir = tempfile::tempdir().unwrap();

    let task = CommandTask::new("printf '%s' '${args}' > ${output}/args");
    let schedule = JobSchedule::builder(TimeRange::parse("2015-10-11T10").unwrap())
        .config(config(dir.path()))
        .args(["--full", "x"])
        .task(task)
        .id("subst")
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;
    assert_eq!(schedule.count(StatusCode::Finished), 1);

    let written = fs::read_to_string(dir.path().join("tasks/subst/2015-10-11T10/args")).unwrap();
    assert_eq!(written, "--full x");
}

#[tokio::test]
async fn command_writes_into_its_output_directory() {
    let dir = tempfile::tempdir().unwrap();

    let schedule = JobSchedule::builder(TimeRange::parse("2015-10-11T10").unwrap())
        .config(config(dir.path()))
        .task(CommandTask::new("echo data > ${output}/data"))
        .id("import")
        .add()
        .unwrap()
        .execute()
        .unwrap();

    with_timeout(schedule.await_finish()).await;
    assert_eq!(schedule.count(StatusCode::Finished), 1, "{:?}", schedule.summary());

    let out = dir.path().join("tasks/import/2015-10-11T10");
    assert_eq!(fs::read_to_string(out.join("data")).unwrap(), "data\n");
    assert!(out.join(SUCCESS_MARKER).is_file());
}

#[tokio::test]
async fn failed_command_with_partial_output_runs_again() {
    let dir = tempfile::tempdir().unwrap();
    let attempts = dir.path().join("attempts.txt");
    let cmd = format!(
        "echo partial > ${{output}}/data; echo x >> {}; exit 1",
        attempts.display()
    );

    for _ in 0..2 {
        let schedule = JobSchedule::builder(TimeRange::parse("2015-10-11T10").unwrap())
            .config(config(dir.path()))
            .task(CommandTask::new(cmd.as_str()))
            .id("flaky")
            .add()
            .unwrap()
            .execute()
            .unwrap();

        with_timeout(schedule.await_finish()).await;
        assert_eq!(schedule.count(StatusCode::Skipped), 0);
        assert_eq!(schedule.count(StatusCode::ErrorExecute), 1);
    }

    assert!(dir.path().join("tasks/flaky/2015-10-11T10/data").is_file());
    assert_eq!(fs::read_to_string(&attempts).unwrap().lines().count(), 2);
}
