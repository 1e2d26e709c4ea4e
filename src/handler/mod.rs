//! Task handler trait and type registry.
//!
//! Handlers contain the domain logic a task executes. They are resolved
//! by the task's `task_type` string through an explicit registry
//! populated at startup - there is no dynamic instantiation, and looking
//! up an unregistered type fails fast.
//!
//! A handler signals failure solely by returning an error; the task
//! process records the error into the task's output and performs the
//! failed-state transition on the handler's behalf.

pub mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::queue::{Task, TaskQueue};

/// Errors that can occur during handler resolution.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No handler registered for the requested task type.
    #[error("no handler registered for task type '{0}'")]
    UnknownTaskType(String),
}

/// Domain logic for one task type.
///
/// The handler receives the task record and a queue handle so it can
/// stream diagnostics into the task's output while it runs.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn run(&self, task: &Task, queue: &TaskQueue) -> anyhow::Result<()>;
}

/// Mapping from task-type string to handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a task type.
    ///
    /// Registering the same type twice replaces the previous handler
    /// (logged), so embedders can override the built-ins.
    pub fn register(&mut self, task_type: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        let task_type = task_type.into();
        if self.handlers.insert(task_type.clone(), handler).is_some() {
            warn!(task_type = %task_type, "replaced existing task handler");
        }
    }

    /// Resolves the handler for a task type, failing fast when none is
    /// registered.
    pub fn resolve(&self, task_type: &str) -> Result<Arc<dyn TaskHandler>, RegistryError> {
        self.handlers
            .get(task_type)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTaskType(task_type.to_string()))
    }

    /// Returns the registered task types, sorted.
    pub fn task_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// Builds the registry shipped with the taskmill binary.
pub fn builtin_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register("echo", Arc::new(builtin::EchoHandler));
    registry.register("command", Arc::new(builtin::CommandHandler));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl TaskHandler for NoopHandler {
        async fn run(&self, _task: &Task, _queue: &TaskQueue) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_resolve_registered_handler() {
        let mut registry = HandlerRegistry::new();
        registry.register("noop", Arc::new(NoopHandler));

        assert!(registry.resolve("noop").is_ok());
    }

    #[test]
    fn test_resolve_unknown_type_fails_fast() {
        let registry = HandlerRegistry::new();

        let err = registry.resolve("missing").err().expect("must fail");
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_builtin_registry_types() {
        let registry = builtin_registry();
        assert_eq!(registry.task_types(), vec!["command", "echo"]);
    }
}
