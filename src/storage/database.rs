//! SQLite connection management for the task store.
//!
//! This module provides the narrow storage capability the queue is built
//! on: a connection pool with explicit reconnection support, plus schema
//! migration plumbing. All task-level semantics live in [`crate::queue`].

use std::str::FromStr;
use std::sync::RwLock;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

use super::migrations::MigrationRunner;

/// Maximum number of pooled connections per process.
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection to the database failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(#[from] super::migrations::MigrationError),
}

/// SQLite database handle.
///
/// The pool sits behind a lock so [`Database::reconnect`] can swap it out
/// while other holders of the same `Database` keep working; every
/// operation grabs a fresh clone of the current pool via
/// [`Database::pool`].
pub struct Database {
    url: String,
    pool: RwLock<SqlitePool>,
}

impl Database {
    /// Connects to the database and returns a new handle.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:///var/lib/taskmill/tasks.db")
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        let pool = Self::build_pool(database_url).await?;

        Ok(Self {
            url: database_url.to_string(),
            pool: RwLock::new(pool),
        })
    }

    async fn build_pool(database_url: &str) -> Result<SqlitePool, DatabaseError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
    }

    /// Returns a clone of the current connection pool.
    pub fn pool(&self) -> SqlitePool {
        self.pool
            .read()
            .expect("database pool lock poisoned")
            .clone()
    }

    /// Returns the connection URL this handle was opened with.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Drops the current pool and opens a fresh one against the same URL.
    ///
    /// Task processes run in their own process image and open their own
    /// pool; a long-lived supervisor uses this to recover from a wedged
    /// connection without restarting.
    pub async fn reconnect(&self) -> Result<(), DatabaseError> {
        let new_pool = Self::build_pool(&self.url).await?;

        let old_pool = {
            let mut guard = self.pool.write().expect("database pool lock poisoned");
            std::mem::replace(&mut *guard, new_pool)
        };

        old_pool.close().await;
        Ok(())
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let runner = MigrationRunner::new(self.pool());
        runner.run_migrations().await?;
        Ok(())
    }
}
