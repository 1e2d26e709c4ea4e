//! Task definitions for the queue.
//!
//! This module defines the core types used by the queue:
//!
//! - `Task`: A persisted unit of work and its diagnostic trail
//! - `TaskStatus`: The four-state lifecycle of a task
//! - `StatusSummary`: Per-status aggregate returned by status queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task in the queue.
///
/// `Queued` and `Processing` are the only non-terminal states. `Complete`
/// and `Failed` rows only leave the table via cleanup.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting to be claimed by a worker.
    Queued,
    /// Claimed by a worker and currently executing.
    Processing,
    /// Finished successfully.
    Complete,
    /// Finished unsuccessfully, or reaped by the dead-task sweep.
    Failed,
}

impl TaskStatus {
    /// All status values, in lifecycle order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Queued,
        TaskStatus::Processing,
        TaskStatus::Complete,
        TaskStatus::Failed,
    ];

    /// The string stored in the status column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Complete => "complete",
            TaskStatus::Failed => "failed",
        }
    }

    /// Maps a stored status string back to the enum.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TaskStatus::Queued),
            "processing" => Some(TaskStatus::Processing),
            "complete" => Some(TaskStatus::Complete),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A persisted unit of work.
///
/// Tasks never live in memory across queue calls - every operation
/// round-trips through the store, so two `Task` values for the same id can
/// legitimately disagree about anything except `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier, immutable once assigned.
    pub id: i64,

    /// Current lifecycle state.
    pub status: TaskStatus,

    /// Handler selector; non-empty (enforced at dispatch).
    pub task_type: String,

    /// Optional human-readable label. Not unique, no scheduling effect.
    pub name: String,

    /// Payload map, set once at dispatch.
    pub data: serde_json::Value,

    /// Append-only diagnostic log produced during execution.
    pub output: String,

    /// When the task was dispatched.
    pub created: DateTime<Utc>,

    /// Bumped on every state transition and every output append.
    pub updated: DateTime<Utc>,
}

impl Task {
    /// Returns whether the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Complete | TaskStatus::Failed)
    }
}

/// Aggregate over one status value.
///
/// Zero-count entries are reported with empty timestamps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSummary {
    /// Number of tasks currently in this status.
    pub items: u64,
    /// Dispatch time of the oldest task in this status.
    pub oldest: Option<DateTime<Utc>>,
    /// Dispatch time of the newest task in this status.
    pub latest: Option<DateTime<Utc>>,
}
