//! Task-process entry point.
//!
//! This is the body of the hidden subcommand the supervisor spawns for
//! each claimed task. It runs in its own process image with its own
//! store connection - nothing is shared with the supervisor.

use tracing::{info, warn};

use crate::handler::HandlerRegistry;
use crate::queue::{Task, TaskQueue};

use super::signals;
use super::supervisor::WorkerError;

/// Runs a single claimed task to completion in the current process.
///
/// Handler failures are recorded into the task's output and reported via
/// the failed transition, and the process still exits cleanly - the
/// supervisor's non-zero-exit fallback only ever fires for process-level
/// crashes, not handler-level failures.
pub async fn run_task(
    queue: &TaskQueue,
    registry: &HandlerRegistry,
    task_id: i64,
) -> Result<(), WorkerError> {
    // Finish or be killed outright; never a graceful stop mid-task.
    signals::ignore_termination_signals();

    let task = queue
        .peek(task_id)
        .await?
        .ok_or(WorkerError::TaskNotFound(task_id))?;

    info!(task_id, task_type = %task.task_type, "task process executing");

    match execute(queue, registry, &task).await {
        Ok(()) => {
            if !queue.complete(task_id).await? {
                warn!(task_id, "task left processing before completion was recorded");
            }
        }
        Err(err) => {
            let detail = format!("handler error: {:#}", err);
            warn!(task_id, error = %detail, "task handler failed");

            if !queue.output(task_id, &detail).await? {
                warn!(task_id, "could not record handler error in task output");
            }
            queue.failed(task_id).await?;
        }
    }

    Ok(())
}

/// Resolves and runs the handler; resolution failure is a handler
/// failure like any other.
async fn execute(
    queue: &TaskQueue,
    registry: &HandlerRegistry,
    task: &Task,
) -> anyhow::Result<()> {
    let handler = registry.resolve(&task.task_type)?;
    handler.run(task, queue).await
}
