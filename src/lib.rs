//! taskmill: database-backed work queue with process-isolated workers.
//!
//! This library provides a persisted task queue (dispatch, claim,
//! complete/fail, cleanup) and a worker supervisor that executes each
//! claimed task in its own OS process.

// Core modules
pub mod cli;
pub mod handler;
pub mod queue;
pub mod storage;
pub mod worker;

// Re-export commonly used types
pub use handler::{HandlerRegistry, RegistryError, TaskHandler};
pub use queue::{ListFilter, QueueError, StatusSummary, Task, TaskQueue, TaskStatus};
pub use storage::{Database, DatabaseError};
pub use worker::{Worker, WorkerConfig, WorkerError};
