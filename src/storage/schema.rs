//! Database schema constants.
//!
//! This module contains all SQL schema definitions for the SQLite
//! storage backend.

/// SQL schema for creating the tasks table.
pub const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL,
    task_type TEXT NOT NULL,
    name TEXT NOT NULL DEFAULT '',
    data TEXT NOT NULL DEFAULT '{}',
    output TEXT NOT NULL DEFAULT '',
    created TEXT NOT NULL,
    updated TEXT NOT NULL
)
"#;

/// Index backing the claim query (oldest queued row by `updated`) and the
/// dead-task sweep (stale processing rows).
pub const CREATE_STATUS_UPDATED_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tasks_status_updated ON tasks(status, updated)
"#;

/// Index backing per-type listing and status aggregation.
pub const CREATE_TYPE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tasks_type ON tasks(task_type)
"#;

/// Returns all schema statements in creation order.
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_TASKS_TABLE,
        CREATE_STATUS_UPDATED_INDEX,
        CREATE_TYPE_INDEX,
    ]
}
