//! Worker supervision: claim, isolate, wait, settle.
//!
//! This module provides the supervisor side of task execution:
//!
//! - **Worker**: the claim loop; forks off one task process at a time
//!   and interprets how it exited
//! - **signals**: the three-class signal escalation state
//! - **child**: the entry point that runs inside the task process
//!
//! # Process model
//!
//! ```text
//!   ┌───────────────┐  spawn exec-task   ┌────────────────┐
//!   │  worker loop  │ ─────────────────> │  task process  │
//!   │  (supervisor) │ <───────────────── │  (handler)     │
//!   └───────┬───────┘     exit status    └───────┬────────┘
//!           │                                    │
//!           │ force-fail on abnormal exit        │ complete / failed
//!           ▼                                    ▼
//!        ┌──────────────────────────────────────────┐
//!        │               task store                 │
//!        └──────────────────────────────────────────┘
//! ```
//!
//! The task process reports its own outcome, including handler failures;
//! the supervisor's exit-status fallback exists for the crashes the task
//! process cannot report (non-zero exits, signal kills). Tasks whose
//! whole worker died are reclaimed by the out-of-band dead-task sweep.

pub mod child;
pub mod signals;
pub mod supervisor;

// Re-export main types for convenience
pub use child::run_task;
pub use signals::{SignalAction, SignalClass, SignalState};
pub use supervisor::{Worker, WorkerConfig, WorkerError, DATABASE_URL_ENV, TASK_SUBCOMMAND};
