//! Handlers shipped with the taskmill binary.

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::queue::{Task, TaskQueue};

use super::TaskHandler;

/// Writes the payload's `message` field to the task output.
///
/// Mostly useful for smoke-testing a deployment end to end.
pub struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn run(&self, task: &Task, queue: &TaskQueue) -> anyhow::Result<()> {
        let message = match task.data.get("message").and_then(|v| v.as_str()) {
            Some(message) => message.to_string(),
            None => task.data.to_string(),
        };

        queue.output(task.id, &message).await?;
        Ok(())
    }
}

/// Runs the payload's `command` (with optional `args`) as a child
/// process, streaming its stdout into the task output line by line.
///
/// A non-zero command exit is a handler failure.
pub struct CommandHandler;

#[async_trait]
impl TaskHandler for CommandHandler {
    async fn run(&self, task: &Task, queue: &TaskQueue) -> anyhow::Result<()> {
        let program = task
            .data
            .get("command")
            .and_then(|v| v.as_str())
            .context("payload is missing a 'command' string")?;

        let args: Vec<String> = match task.data.get("args") {
            Some(value) => serde_json::from_value(value.clone())
                .context("payload 'args' must be an array of strings")?,
            None => Vec::new(),
        };

        let mut child = Command::new(program)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run '{}'", program))?;

        let stderr = child
            .stderr
            .take()
            .context("failed to capture command stderr")?;
        let stderr_lines = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
            collected
        });

        let stdout = child
            .stdout
            .take()
            .context("failed to capture command stdout")?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            queue.output(task.id, &line).await?;
        }

        let status = child.wait().await?;

        for line in stderr_lines.await.unwrap_or_default() {
            queue.output(task.id, &format!("stderr: {}", line)).await?;
        }

        if !status.success() {
            bail!("command exited with {}", status);
        }

        Ok(())
    }
}
