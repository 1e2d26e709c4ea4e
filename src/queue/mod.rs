//! Persisted task queue with atomic claiming and lifecycle cleanup.
//!
//! This module is the state-machine authority for tasks:
//!
//! - **TaskQueue**: dispatch, introspection, atomic claim, terminal
//!   transitions, output streaming, and cleanup
//! - **Task** / **TaskStatus**: the persisted entity and its lifecycle
//!
//! # State machine
//!
//! ```text
//!          dispatch                grab (conditional update)
//!  (none) ---------> queued -----------------------------> processing
//!                                                             |   |
//!                                                   complete  |   | failed / dead sweep
//!                                                             v   v
//!                                                       complete   failed
//! ```
//!
//! `queued` and `processing` are the only non-terminal states; terminal
//! rows leave the table only through `clean`. There is no
//! retry-from-failed transition - retrying is dispatching a new task.
//!
//! # Example
//!
//! ```rust,ignore
//! use taskmill::queue::TaskQueue;
//!
//! let queue = TaskQueue::connect("sqlite://tasks.db").await?;
//! let id = queue.dispatch("echo", "greeting", serde_json::json!({"message": "hi"})).await?;
//!
//! // A worker claims and finishes it.
//! if let Some(task) = queue.grab("worker-1").await? {
//!     queue.output(task.id, "working").await?;
//!     queue.complete(task.id).await?;
//! }
//! ```

pub mod task;
pub mod task_queue;

// Re-export main types for convenience
pub use task::{StatusSummary, Task, TaskStatus};
pub use task_queue::{ListFilter, QueueError, TaskQueue, DEAD_TASK_MARKER};
