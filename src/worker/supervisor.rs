//! Worker supervisor loop.
//!
//! A worker turns the queue's claim primitive into continuous, isolated
//! task execution: it polls for claimable work, runs each claimed task in
//! its own OS process, interprets how that process exited, and responds
//! to termination signals with graceful-then-forced shutdown.
//!
//! Concurrency across tasks comes entirely from running multiple worker
//! processes; within one worker exactly one task process is in flight at
//! a time.

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use crate::queue::{QueueError, Task, TaskQueue};

use super::signals::{self, SignalClass, SignalState};

/// Subcommand of the taskmill binary that runs a single claimed task.
pub const TASK_SUBCOMMAND: &str = "exec-task";

/// Environment variable carrying the store URL into the task process.
pub const DATABASE_URL_ENV: &str = "TASKMILL_DATABASE_URL";

/// How often the supervisor polls a running task process for exit.
///
/// Deliberately a poll rather than a blocking wait so queued signal
/// actions are serviced promptly.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors that can stop a worker.
///
/// Everything else - lost claim races, state conflicts, handler failures,
/// task-process crashes - is logged and survived.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The task process could not be spawned (resource exhaustion or a
    /// missing executable). Fatal: not retried.
    #[error("failed to spawn task process: {0}")]
    Spawn(std::io::Error),

    /// The task to execute does not exist in the store.
    #[error("task {0} not found")]
    TaskNotFound(i64),

    /// Queue operation failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Ceiling on how long one worker loop runs before it self-terminates.
    /// Checked only between tasks; an in-flight task is never preempted.
    pub max_execution_time: Duration,
    /// Sleep between unsuccessful claim attempts.
    pub poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_execution_time: Duration::from_secs(100),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    /// Sets the execution time ceiling.
    pub fn with_max_execution_time(mut self, max_execution_time: Duration) -> Self {
        self.max_execution_time = max_execution_time;
        self
    }

    /// Sets the claim poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// How a task process terminated, from the supervisor's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskExit {
    /// Normal exit with code 0. The task process already reported its own
    /// outcome through the queue - including handler failures, which it
    /// records and still exits 0 on.
    Clean,
    /// Normal exit with a non-zero code.
    Code(i32),
    /// Killed by a signal.
    Signaled(i32),
}

impl From<ExitStatus> for TaskExit {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(0) => TaskExit::Clean,
            Some(code) => TaskExit::Code(code),
            None => TaskExit::Signaled(status.signal().unwrap_or(0)),
        }
    }
}

/// A single worker: one claim loop, one task process at a time.
pub struct Worker {
    /// Worker identity used in claim logs - its own process id.
    id: String,
    queue: TaskQueue,
    config: WorkerConfig,
    signals: Arc<SignalState>,
}

impl Worker {
    /// Creates a worker over the given queue.
    pub fn new(queue: TaskQueue, config: WorkerConfig) -> Self {
        Self {
            id: std::process::id().to_string(),
            queue,
            config,
            signals: Arc::new(SignalState::new()),
        }
    }

    /// Runs the supervisor loop until shutdown is requested or the
    /// execution time budget runs out.
    pub async fn run(&self) -> Result<(), WorkerError> {
        self.install_signal_listeners()?;

        let started = Instant::now();
        info!(
            worker_id = %self.id,
            max_execution_time_secs = self.config.max_execution_time.as_secs(),
            "worker started"
        );

        loop {
            if self.signals.shutdown_requested() {
                info!(worker_id = %self.id, "shutdown requested, stopping");
                break;
            }

            if started.elapsed() >= self.config.max_execution_time {
                info!(worker_id = %self.id, "execution time budget reached, stopping");
                break;
            }

            match self.queue.grab(&self.id).await {
                Ok(Some(task)) => self.supervise(task).await?,
                Ok(None) => tokio::time::sleep(self.config.poll_interval).await,
                Err(e) => {
                    error!(worker_id = %self.id, error = %e, "claim failed, reconnecting");
                    if let Err(e) = self.queue.reconnect().await {
                        error!(worker_id = %self.id, error = %e, "reconnect failed");
                    }
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }

        info!(worker_id = %self.id, "worker stopped");
        Ok(())
    }

    /// Registers listener tasks for the three termination-signal classes.
    fn install_signal_listeners(&self) -> Result<(), WorkerError> {
        let classes = [
            (SignalKind::interrupt(), SignalClass::Interrupt),
            (SignalKind::terminate(), SignalClass::Terminate),
            (SignalKind::quit(), SignalClass::Quit),
        ];

        for (kind, class) in classes {
            let mut stream = signal(kind)?;
            let state = Arc::clone(&self.signals);
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    signals::deliver(&state, class);
                }
            });
        }

        Ok(())
    }

    /// Runs one claimed task in its own OS process and settles its fate.
    ///
    /// The task process is the taskmill binary re-executed with the
    /// hidden task subcommand; it opens its own store connection and
    /// reports its own outcome. The supervisor only has to catch the
    /// cases the task process cannot report itself: non-zero exits and
    /// signal kills.
    async fn supervise(&self, task: Task) -> Result<(), WorkerError> {
        let exe = std::env::current_exe().map_err(WorkerError::Spawn)?;

        let mut child = Command::new(exe)
            .arg(TASK_SUBCOMMAND)
            .arg("--task-id")
            .arg(task.id.to_string())
            .env(DATABASE_URL_ENV, self.queue.database_url())
            .spawn()
            .map_err(WorkerError::Spawn)?;

        if let Some(pid) = child.id() {
            self.signals.track_task(pid);
            info!(worker_id = %self.id, task_id = task.id, pid, "task process started");
        }

        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => tokio::time::sleep(WAIT_POLL_INTERVAL).await,
            }
        };
        self.signals.clear_task();

        match TaskExit::from(status) {
            TaskExit::Clean => {
                debug!(worker_id = %self.id, task_id = task.id, "task process exited cleanly");
            }
            TaskExit::Code(code) => {
                warn!(worker_id = %self.id, task_id = task.id, code, "task process exited abnormally");
                self.force_fail(&task, &format!("task process exited with code {}", code))
                    .await;
            }
            TaskExit::Signaled(sig) => {
                warn!(worker_id = %self.id, task_id = task.id, signal = sig, "task process was killed");
                self.force_fail(&task, &format!("task process killed by signal {}", sig))
                    .await;
            }
        }

        Ok(())
    }

    /// Records a diagnostic and forces the failed transition after an
    /// abnormal task-process exit. Best effort: a task that already
    /// reached a terminal state is left alone (the queue logs the
    /// refused transition).
    async fn force_fail(&self, task: &Task, reason: &str) {
        if let Err(e) = self.queue.output(task.id, reason).await {
            warn!(task_id = task.id, error = %e, "could not append crash diagnostic");
        }

        if let Err(e) = self.queue.failed(task.id).await {
            warn!(task_id = task.id, error = %e, "could not mark task failed");
        }
    }
}
