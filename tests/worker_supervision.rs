//! End-to-end supervision tests driving the compiled taskmill binary.
//!
//! These cover the paths unit tests cannot: the worker re-executing
//! itself for each claimed task, the task process reporting through its
//! own store connection, and signal-driven graceful shutdown.

use std::time::Duration;

use serde_json::json;
use taskmill::queue::{TaskQueue, TaskStatus};

const BIN: &str = env!("CARGO_BIN_EXE_taskmill");

async fn test_queue() -> (TaskQueue, String, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("tasks.db").display());
    let queue = TaskQueue::connect(&url).await.expect("connect");
    (queue, url, dir)
}

#[tokio::test]
async fn exec_task_completes_a_claimed_task() {
    let (queue, url, _dir) = test_queue().await;

    let id = queue
        .dispatch("echo", "greeting", json!({"message": "hi"}))
        .await
        .expect("dispatch");
    queue.grab("itest").await.expect("grab").expect("task");

    let status = tokio::process::Command::new(BIN)
        .args(["exec-task", "--task-id", &id.to_string()])
        .env("TASKMILL_DATABASE_URL", &url)
        .status()
        .await
        .expect("run exec-task");
    assert!(status.success());

    let task = queue.peek(id).await.expect("peek").expect("task");
    assert_eq!(task.status, TaskStatus::Complete);
    assert_eq!(task.output, "hi\n");
}

#[tokio::test]
async fn worker_survives_handler_failure_and_finishes_next_task() {
    let (queue, url, _dir) = test_queue().await;

    let bad = queue
        .dispatch("no-such-type", "bad", json!({}))
        .await
        .expect("dispatch");
    let good = queue
        .dispatch("echo", "good", json!({"message": "ok"}))
        .await
        .expect("dispatch");

    let status = tokio::process::Command::new(BIN)
        .args(["worker", "--max-execution-time", "3", "--poll-interval", "0.2"])
        .env("TASKMILL_DATABASE_URL", &url)
        .status()
        .await
        .expect("run worker");
    assert!(status.success());

    // The unregistered type failed with a diagnostic trail...
    let task = queue.peek(bad).await.expect("peek").expect("task");
    assert_eq!(task.status, TaskStatus::Failed);
    assert!(task.output.contains("no handler registered"));

    // ...and the worker went on to complete the next task.
    let task = queue.peek(good).await.expect("peek").expect("task");
    assert_eq!(task.status, TaskStatus::Complete);
    assert_eq!(task.output, "ok\n");
}

#[tokio::test]
async fn worker_stops_gracefully_on_interrupt() {
    let (_queue, url, _dir) = test_queue().await;

    let mut child = tokio::process::Command::new(BIN)
        .args(["worker", "--max-execution-time", "30", "--poll-interval", "0.2"])
        .env("TASKMILL_DATABASE_URL", &url)
        .spawn()
        .expect("spawn worker");

    // Let the worker reach its claim loop before signalling.
    tokio::time::sleep(Duration::from_millis(700)).await;

    let pid = child.id().expect("pid") as libc::pid_t;
    let rc = unsafe { libc::kill(pid, libc::SIGINT) };
    assert_eq!(rc, 0);

    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("worker exits after SIGINT")
        .expect("wait");
    assert!(status.success());
}
