//! SQLite persistent storage system.
//!
//! This module provides the storage capability the task queue sits on:
//!
//! - **Database**: SQLite connection pool with explicit reconnection
//! - **Migrations**: Schema management and versioning
//!
//! The queue issues all of its SQL through [`Database::pool`]; nothing in
//! this module knows about task semantics.

pub mod database;
pub mod migrations;
pub mod schema;

// Re-export main types for convenience
pub use database::{Database, DatabaseError};
pub use migrations::{AppliedMigration, MigrationError, MigrationRunner};
