//! Persisted task queue with atomic claiming.
//!
//! Every status change is a single conditional UPDATE keyed on
//! `(id, expected_status)`. That WHERE clause is the only concurrency
//! mechanism in the system: workers on separate processes or hosts
//! coordinate purely through it, never through in-process locks.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::storage::{Database, DatabaseError};

use super::task::{StatusSummary, Task, TaskStatus};

/// Default result bound for list queries.
const DEFAULT_LIST_LIMIT: u32 = 50;

/// Diagnostic line appended to tasks reclaimed by the dead-task sweep.
pub const DEAD_TASK_MARKER: &str = "task reaped: worker never reported completion";

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Dispatch was called with an empty task type.
    #[error("task type must not be empty")]
    EmptyTaskType,

    /// The store holds a status string outside the known enum.
    #[error("unknown task status '{0}' in store")]
    UnknownStatus(String),

    /// Connection-level failure.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Query execution failed.
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// Task payload could not be (de)serialized.
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Filter criteria for listing tasks.
#[derive(Debug, Clone)]
pub struct ListFilter {
    /// Statuses to include; empty means all.
    pub statuses: Vec<TaskStatus>,
    /// Task types to include; empty means all.
    pub task_types: Vec<String>,
    /// Maximum number of results.
    pub limit: u32,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            statuses: Vec::new(),
            task_types: Vec::new(),
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl ListFilter {
    /// Creates a new unconstrained filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a status to filter on.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.statuses.push(status);
        self
    }

    /// Adds a task type to filter on.
    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_types.push(task_type.into());
        self
    }

    /// Sets the result limit.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// The queue: state-machine authority over the tasks table.
///
/// Cloning is cheap; all clones share the same underlying [`Database`],
/// so a handler can be handed a queue handle for output streaming while
/// the supervisor keeps its own.
#[derive(Clone)]
pub struct TaskQueue {
    db: Arc<Database>,
}

impl TaskQueue {
    /// Connects to the store and runs migrations.
    pub async fn connect(database_url: &str) -> Result<Self, QueueError> {
        let db = Database::connect(database_url).await?;
        db.run_migrations().await?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Wraps an already-connected database.
    ///
    /// The caller is responsible for having run migrations.
    pub fn from_database(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Returns the connection URL of the underlying store.
    pub fn database_url(&self) -> &str {
        self.db.url()
    }

    /// Re-establishes the underlying storage connection.
    pub async fn reconnect(&self) -> Result<(), QueueError> {
        self.db.reconnect().await?;
        Ok(())
    }

    /// Inserts a new task in `queued` status and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `QueueError::EmptyTaskType` if `task_type` is empty.
    pub async fn dispatch(
        &self,
        task_type: &str,
        name: &str,
        data: serde_json::Value,
    ) -> Result<i64, QueueError> {
        if task_type.is_empty() {
            return Err(QueueError::EmptyTaskType);
        }

        let now = Utc::now();
        let payload = serde_json::to_string(&data)?;

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (status, task_type, name, data, output, created, updated)
            VALUES (?, ?, ?, ?, '', ?, ?)
            "#,
        )
        .bind(TaskStatus::Queued.as_str())
        .bind(task_type)
        .bind(name)
        .bind(payload)
        .bind(now)
        .bind(now)
        .execute(&self.db.pool())
        .await?;

        let id = result.last_insert_rowid();
        info!(task_id = id, task_type = %task_type, name = %name, "task dispatched");

        Ok(id)
    }

    /// Reads a single task by id.
    ///
    /// Returns `None` (not an error) if no row matches.
    pub async fn peek(&self, id: i64) -> Result<Option<Task>, QueueError> {
        let row = sqlx::query(
            r#"
            SELECT id, status, task_type, name, data, output, created, updated
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(task_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Lists tasks matching the given filter, newest-first.
    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<Task>, QueueError> {
        let mut query = String::from(
            r#"
            SELECT id, status, task_type, name, data, output, created, updated
            FROM tasks
            "#,
        );

        let mut conditions = Vec::new();

        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            conditions.push(format!("status IN ({})", placeholders));
        }

        if !filter.task_types.is_empty() {
            let placeholders = vec!["?"; filter.task_types.len()].join(", ");
            conditions.push(format!("task_type IN ({})", placeholders));
        }

        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }

        query.push_str(" ORDER BY created DESC LIMIT ?");

        let mut sqlx_query = sqlx::query(&query);

        for status in &filter.statuses {
            sqlx_query = sqlx_query.bind(status.as_str());
        }

        for task_type in &filter.task_types {
            sqlx_query = sqlx_query.bind(task_type.as_str());
        }

        sqlx_query = sqlx_query.bind(filter.limit as i64);

        let rows = sqlx_query.fetch_all(&self.db.pool()).await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            tasks.push(task_from_row(row)?);
        }

        Ok(tasks)
    }

    /// Returns a per-status aggregate, optionally scoped to one task type.
    ///
    /// Every status value is present in the result, zero-count entries
    /// with empty timestamps.
    pub async fn status(
        &self,
        task_type: Option<&str>,
    ) -> Result<BTreeMap<TaskStatus, StatusSummary>, QueueError> {
        let mut query = String::from(
            r#"
            SELECT status, COUNT(*) AS items, MIN(created) AS oldest, MAX(created) AS latest
            FROM tasks
            "#,
        );

        if task_type.is_some() {
            query.push_str(" WHERE task_type = ?");
        }

        query.push_str(" GROUP BY status");

        let mut sqlx_query = sqlx::query(&query);
        if let Some(task_type) = task_type {
            sqlx_query = sqlx_query.bind(task_type);
        }

        let rows = sqlx_query.fetch_all(&self.db.pool()).await?;

        let mut summary: BTreeMap<TaskStatus, StatusSummary> = TaskStatus::ALL
            .into_iter()
            .map(|status| (status, StatusSummary::default()))
            .collect();

        for row in rows {
            let raw: String = row.get("status");
            let status = TaskStatus::from_str(&raw).ok_or(QueueError::UnknownStatus(raw))?;
            let items: i64 = row.get("items");

            summary.insert(
                status,
                StatusSummary {
                    items: items as u64,
                    oldest: row.get("oldest"),
                    latest: row.get("latest"),
                },
            );
        }

        Ok(summary)
    }

    /// Bulk-deletes terminal tasks last touched at or before `before`.
    ///
    /// Removes `complete` rows, plus `failed` rows when `include_failed`
    /// is set. Returns the number of rows deleted.
    pub async fn clean(
        &self,
        before: DateTime<Utc>,
        include_failed: bool,
    ) -> Result<u64, QueueError> {
        let result = if include_failed {
            sqlx::query("DELETE FROM tasks WHERE status IN (?, ?) AND updated <= ?")
                .bind(TaskStatus::Complete.as_str())
                .bind(TaskStatus::Failed.as_str())
                .bind(before)
                .execute(&self.db.pool())
                .await?
        } else {
            sqlx::query("DELETE FROM tasks WHERE status = ? AND updated <= ?")
                .bind(TaskStatus::Complete.as_str())
                .bind(before)
                .execute(&self.db.pool())
                .await?
        };

        let deleted = result.rows_affected();
        info!(deleted, include_failed, "cleaned terminal tasks");

        Ok(deleted)
    }

    /// Transitions stale `processing` tasks to `failed`.
    ///
    /// This is the sweeper for tasks whose worker died without reporting
    /// failure: any row still `processing` with `updated <= before` is
    /// marked failed and gets [`DEAD_TASK_MARKER`] appended to its
    /// output. Returns the number of rows transitioned.
    pub async fn dead(&self, before: DateTime<Utc>) -> Result<u64, QueueError> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, output = output || ?, updated = ?
            WHERE status = ? AND updated <= ?
            "#,
        )
        .bind(TaskStatus::Failed.as_str())
        .bind(format!("{}\n", DEAD_TASK_MARKER))
        .bind(Utc::now())
        .bind(TaskStatus::Processing.as_str())
        .bind(before)
        .execute(&self.db.pool())
        .await?;

        let reaped = result.rows_affected();
        if reaped > 0 {
            warn!(reaped, "reaped dead tasks");
        }

        Ok(reaped)
    }

    /// Atomically claims the oldest queued task for `worker_id`.
    ///
    /// Two steps: select the oldest `queued` id, then a conditional
    /// UPDATE gated on the status still being `queued`. The select is
    /// intentionally racy - correctness comes entirely from the UPDATE's
    /// WHERE clause, which guarantees at most one worker ever moves a
    /// given id out of `queued`. A lost race returns `None` without
    /// retrying; the caller's polling loop is the retry.
    pub async fn grab(&self, worker_id: &str) -> Result<Option<Task>, QueueError> {
        let candidate = sqlx::query(
            "SELECT id FROM tasks WHERE status = ? ORDER BY updated ASC LIMIT 1",
        )
        .bind(TaskStatus::Queued.as_str())
        .fetch_optional(&self.db.pool())
        .await?;

        let Some(row) = candidate else {
            return Ok(None);
        };
        let id: i64 = row.get("id");

        let result = sqlx::query("UPDATE tasks SET status = ?, updated = ? WHERE id = ? AND status = ?")
            .bind(TaskStatus::Processing.as_str())
            .bind(Utc::now())
            .bind(id)
            .bind(TaskStatus::Queued.as_str())
            .execute(&self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            debug!(task_id = id, worker_id = %worker_id, "lost claim race");
            return Ok(None);
        }

        info!(task_id = id, worker_id = %worker_id, "task claimed");
        self.peek(id).await
    }

    /// Conditional transition `processing` -> `complete`.
    ///
    /// Returns `false` (logged, never an error) if the task does not
    /// exist or is not in `processing`.
    pub async fn complete(&self, id: i64) -> Result<bool, QueueError> {
        let moved = self
            .transition(id, TaskStatus::Processing, TaskStatus::Complete)
            .await?;

        if moved {
            info!(task_id = id, "task complete");
        } else {
            warn!(task_id = id, "complete refused: task not in processing");
        }

        Ok(moved)
    }

    /// Conditional transition `processing` -> `failed`.
    ///
    /// Same non-fatal `false` semantics as [`TaskQueue::complete`].
    pub async fn failed(&self, id: i64) -> Result<bool, QueueError> {
        let moved = self
            .transition(id, TaskStatus::Processing, TaskStatus::Failed)
            .await?;

        if moved {
            info!(task_id = id, "task failed");
        } else {
            warn!(task_id = id, "failed refused: task not in processing");
        }

        Ok(moved)
    }

    /// Appends a line to the task's output while it is `processing`.
    ///
    /// Returns `false` if the task is missing or not in `processing`.
    pub async fn output(&self, id: i64, data: &str) -> Result<bool, QueueError> {
        let result = sqlx::query(
            "UPDATE tasks SET output = output || ?, updated = ? WHERE id = ? AND status = ?",
        )
        .bind(format!("{}\n", data))
        .bind(Utc::now())
        .bind(id)
        .bind(TaskStatus::Processing.as_str())
        .execute(&self.db.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// The single atomic conditional update every status change goes
    /// through.
    async fn transition(
        &self,
        id: i64,
        from: TaskStatus,
        to: TaskStatus,
    ) -> Result<bool, QueueError> {
        let result = sqlx::query("UPDATE tasks SET status = ?, updated = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(Utc::now())
            .bind(id)
            .bind(from.as_str())
            .execute(&self.db.pool())
            .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Maps a tasks row to the entity, deserializing payload and status.
fn task_from_row(row: &SqliteRow) -> Result<Task, QueueError> {
    let raw_status: String = row.get("status");
    let status =
        TaskStatus::from_str(&raw_status).ok_or(QueueError::UnknownStatus(raw_status))?;

    let raw_data: String = row.get("data");
    let data = serde_json::from_str(&raw_data)?;

    Ok(Task {
        id: row.get("id"),
        status,
        task_type: row.get("task_type"),
        name: row.get("name"),
        data,
        output: row.get("output"),
        created: row.get("created"),
        updated: row.get("updated"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    async fn test_queue() -> (TaskQueue, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("tasks.db").display());
        let queue = TaskQueue::connect(&url).await.expect("connect");
        (queue, dir)
    }

    /// Rewrites a task's `updated` column directly, bypassing the state
    /// machine, to simulate the passage of time.
    async fn backdate_updated(queue: &TaskQueue, id: i64, updated: DateTime<Utc>) {
        sqlx::query("UPDATE tasks SET updated = ? WHERE id = ?")
            .bind(updated)
            .bind(id)
            .execute(&queue.db.pool())
            .await
            .expect("backdate");
    }

    async fn backdate_created(queue: &TaskQueue, id: i64, created: DateTime<Utc>) {
        sqlx::query("UPDATE tasks SET created = ? WHERE id = ?")
            .bind(created)
            .bind(id)
            .execute(&queue.db.pool())
            .await
            .expect("backdate");
    }

    #[tokio::test]
    async fn test_dispatch_round_trip() {
        let (queue, _dir) = test_queue().await;

        let data = json!({"msg": "hi", "count": 3});
        let id = queue
            .dispatch("echo", "t1", data.clone())
            .await
            .expect("dispatch");

        let task = queue.peek(id).await.expect("peek").expect("task exists");
        assert_eq!(task.id, id);
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.task_type, "echo");
        assert_eq!(task.name, "t1");
        assert_eq!(task.data, data);
        assert_eq!(task.output, "");
        assert_eq!(task.created, task.updated);
    }

    #[tokio::test]
    async fn test_dispatch_rejects_empty_type() {
        let (queue, _dir) = test_queue().await;

        let result = queue.dispatch("", "t1", json!({})).await;
        assert!(matches!(result, Err(QueueError::EmptyTaskType)));
    }

    #[tokio::test]
    async fn test_peek_missing_is_none() {
        let (queue, _dir) = test_queue().await;
        assert!(queue.peek(999).await.expect("peek").is_none());
    }

    #[tokio::test]
    async fn test_grab_claims_oldest_queued() {
        let (queue, _dir) = test_queue().await;

        let first = queue.dispatch("echo", "a", json!({})).await.expect("dispatch");
        let second = queue.dispatch("echo", "b", json!({})).await.expect("dispatch");

        let now = Utc::now();
        backdate_updated(&queue, first, now - Duration::minutes(2)).await;
        backdate_updated(&queue, second, now - Duration::minutes(1)).await;

        let claimed = queue.grab("w1").await.expect("grab").expect("task");
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.status, TaskStatus::Processing);

        let claimed = queue.grab("w1").await.expect("grab").expect("task");
        assert_eq!(claimed.id, second);

        assert!(queue.grab("w1").await.expect("grab").is_none());
    }

    #[tokio::test]
    async fn test_grab_complete_scenario() {
        let (queue, _dir) = test_queue().await;

        let id = queue
            .dispatch("echo", "t1", json!({"msg": "hi"}))
            .await
            .expect("dispatch");

        let task = queue.grab("w1").await.expect("grab").expect("task");
        assert_eq!(task.id, id);
        assert_eq!(task.status, TaskStatus::Processing);

        assert!(queue.complete(id).await.expect("complete"));
        let task = queue.peek(id).await.expect("peek").expect("task");
        assert_eq!(task.status, TaskStatus::Complete);
    }

    #[tokio::test]
    async fn test_concurrent_grab_claims_at_most_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("tasks.db").display());
        let q1 = TaskQueue::connect(&url).await.expect("connect");
        let q2 = TaskQueue::connect(&url).await.expect("connect");

        q1.dispatch("echo", "contested", json!({})).await.expect("dispatch");

        let (a, b) = tokio::join!(q1.grab("w1"), q2.grab("w2"));
        let a = a.expect("grab w1");
        let b = b.expect("grab w2");

        // Exactly one worker wins the conditional update.
        assert!(a.is_some() ^ b.is_some());

        let winner = a.or(b).expect("one winner");
        assert_eq!(winner.status, TaskStatus::Processing);
    }

    #[tokio::test]
    async fn test_transitions_require_processing() {
        let (queue, _dir) = test_queue().await;

        let id = queue.dispatch("echo", "t", json!({})).await.expect("dispatch");

        // All three operations are refused while the task is queued.
        assert!(!queue.complete(id).await.expect("complete"));
        assert!(!queue.failed(id).await.expect("failed"));
        assert!(!queue.output(id, "nope").await.expect("output"));

        let task = queue.peek(id).await.expect("peek").expect("task");
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(task.output, "");

        // Terminal states are closed too.
        queue.grab("w1").await.expect("grab").expect("task");
        assert!(queue.complete(id).await.expect("complete"));
        assert!(!queue.complete(id).await.expect("second complete"));
        assert!(!queue.failed(id).await.expect("failed after complete"));
        assert!(!queue.output(id, "late").await.expect("output after complete"));

        let task = queue.peek(id).await.expect("peek").expect("task");
        assert_eq!(task.status, TaskStatus::Complete);
    }

    #[tokio::test]
    async fn test_missing_task_transitions_return_false() {
        let (queue, _dir) = test_queue().await;

        assert!(!queue.complete(42).await.expect("complete"));
        assert!(!queue.failed(42).await.expect("failed"));
        assert!(!queue.output(42, "ghost").await.expect("output"));
    }

    #[tokio::test]
    async fn test_output_appends_with_newline() {
        let (queue, _dir) = test_queue().await;

        let id = queue.dispatch("echo", "t", json!({})).await.expect("dispatch");
        queue.grab("w1").await.expect("grab").expect("task");

        let before = queue.peek(id).await.expect("peek").expect("task");

        assert!(queue.output(id, "line one").await.expect("output"));
        assert!(queue.output(id, "line two").await.expect("output"));

        let task = queue.peek(id).await.expect("peek").expect("task");
        assert_eq!(task.output, "line one\nline two\n");
        assert!(task.updated >= before.updated);
    }

    #[tokio::test]
    async fn test_dead_reaps_stale_processing_inclusive() {
        let (queue, _dir) = test_queue().await;

        let stale = queue.dispatch("echo", "stale", json!({})).await.expect("dispatch");
        let boundary = queue.dispatch("echo", "boundary", json!({})).await.expect("dispatch");
        let fresh = queue.dispatch("echo", "fresh", json!({})).await.expect("dispatch");

        for _ in 0..3 {
            queue.grab("w1").await.expect("grab").expect("task");
        }

        let cutoff = Utc::now();
        backdate_updated(&queue, stale, cutoff - Duration::hours(1)).await;
        backdate_updated(&queue, boundary, cutoff).await;
        backdate_updated(&queue, fresh, cutoff + Duration::seconds(10)).await;

        let reaped = queue.dead(cutoff).await.expect("dead");
        assert_eq!(reaped, 2);

        let task = queue.peek(stale).await.expect("peek").expect("task");
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.output.contains(DEAD_TASK_MARKER));

        // The boundary is inclusive: updated == before is reaped.
        let task = queue.peek(boundary).await.expect("peek").expect("task");
        assert_eq!(task.status, TaskStatus::Failed);

        let task = queue.peek(fresh).await.expect("peek").expect("task");
        assert_eq!(task.status, TaskStatus::Processing);
        assert!(!task.output.contains(DEAD_TASK_MARKER));
    }

    #[tokio::test]
    async fn test_dead_ignores_queued_tasks() {
        let (queue, _dir) = test_queue().await;

        let id = queue.dispatch("echo", "t", json!({})).await.expect("dispatch");
        backdate_updated(&queue, id, Utc::now() - Duration::hours(2)).await;

        assert_eq!(queue.dead(Utc::now()).await.expect("dead"), 0);

        let task = queue.peek(id).await.expect("peek").expect("task");
        assert_eq!(task.status, TaskStatus::Queued);
    }

    #[tokio::test]
    async fn test_clean_is_scoped() {
        let (queue, _dir) = test_queue().await;

        let complete_old = queue.dispatch("echo", "a", json!({})).await.expect("dispatch");
        let failed_old = queue.dispatch("echo", "b", json!({})).await.expect("dispatch");
        let complete_new = queue.dispatch("echo", "c", json!({})).await.expect("dispatch");
        let processing = queue.dispatch("echo", "d", json!({})).await.expect("dispatch");
        let queued = queue.dispatch("echo", "e", json!({})).await.expect("dispatch");

        for _ in 0..4 {
            queue.grab("w1").await.expect("grab").expect("task");
        }
        queue.complete(complete_old).await.expect("complete");
        queue.failed(failed_old).await.expect("failed");
        queue.complete(complete_new).await.expect("complete");

        let cutoff = Utc::now() - Duration::days(7);
        backdate_updated(&queue, complete_old, cutoff - Duration::days(1)).await;
        backdate_updated(&queue, failed_old, cutoff - Duration::days(1)).await;

        // include_failed=false removes only the old complete row.
        let deleted = queue.clean(cutoff, false).await.expect("clean");
        assert_eq!(deleted, 1);
        assert!(queue.peek(complete_old).await.expect("peek").is_none());
        assert!(queue.peek(failed_old).await.expect("peek").is_some());

        // include_failed=true takes the old failed row too.
        let deleted = queue.clean(cutoff, true).await.expect("clean");
        assert_eq!(deleted, 1);
        assert!(queue.peek(failed_old).await.expect("peek").is_none());

        // Recent terminal rows and non-terminal rows are untouched.
        assert!(queue.peek(complete_new).await.expect("peek").is_some());
        assert!(queue.peek(queued).await.expect("peek").is_some());
        assert!(queue.peek(processing).await.expect("peek").is_some());
    }

    #[tokio::test]
    async fn test_status_reports_all_states() {
        let (queue, _dir) = test_queue().await;

        let summary = queue.status(None).await.expect("status");
        assert_eq!(summary.len(), 4);
        for status in TaskStatus::ALL {
            let entry = &summary[&status];
            assert_eq!(entry.items, 0);
            assert!(entry.oldest.is_none());
            assert!(entry.latest.is_none());
        }

        queue.dispatch("echo", "a", json!({})).await.expect("dispatch");
        queue.dispatch("echo", "b", json!({})).await.expect("dispatch");
        queue.dispatch("resize", "c", json!({})).await.expect("dispatch");
        queue.grab("w1").await.expect("grab").expect("task");

        let summary = queue.status(None).await.expect("status");
        assert_eq!(summary[&TaskStatus::Queued].items, 2);
        assert_eq!(summary[&TaskStatus::Processing].items, 1);
        assert_eq!(summary[&TaskStatus::Complete].items, 0);
        assert!(summary[&TaskStatus::Queued].oldest.is_some());

        // Scoped to one task type.
        let summary = queue.status(Some("resize")).await.expect("status");
        let total: u64 = summary.values().map(|s| s.items).sum();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let (queue, _dir) = test_queue().await;

        let a = queue.dispatch("echo", "a", json!({})).await.expect("dispatch");
        let b = queue.dispatch("resize", "b", json!({})).await.expect("dispatch");
        let c = queue.dispatch("echo", "c", json!({})).await.expect("dispatch");

        let now = Utc::now();
        backdate_created(&queue, a, now - Duration::minutes(3)).await;
        backdate_created(&queue, b, now - Duration::minutes(2)).await;
        backdate_created(&queue, c, now - Duration::minutes(1)).await;

        // Unfiltered: newest first.
        let tasks = queue.list(&ListFilter::new()).await.expect("list");
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![c, b, a]);

        // Type filter.
        let filter = ListFilter::new().with_task_type("echo");
        let tasks = queue.list(&filter).await.expect("list");
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![c, a]);

        // Status filter.
        queue.grab("w1").await.expect("grab").expect("task");
        let filter = ListFilter::new().with_status(TaskStatus::Processing);
        let tasks = queue.list(&filter).await.expect("list");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, a);

        // Limit bounds the result.
        let filter = ListFilter::new().with_limit(2);
        let tasks = queue.list(&filter).await.expect("list");
        assert_eq!(tasks.len(), 2);
    }
}
