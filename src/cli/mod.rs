//! Command-line interface for taskmill.
//!
//! Provides commands for dispatching tasks, inspecting the queue,
//! cleanup, and running workers.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli};
