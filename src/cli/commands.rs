//! CLI command definitions for taskmill.
//!
//! This module wires the queue and worker APIs to the command line:
//! producers dispatch and inspect tasks, operators clean and sweep, and
//! `worker` runs the supervisor loop. The hidden `exec-task` subcommand
//! is the entry point for the task processes workers spawn.

use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use clap::Parser;

use crate::handler::builtin_registry;
use crate::queue::{ListFilter, TaskQueue, TaskStatus};
use crate::worker::{self, Worker, WorkerConfig};

/// Default SQLite database location.
const DEFAULT_DATABASE_URL: &str = "sqlite://taskmill.db";

/// Database-backed work queue with process-isolated workers.
#[derive(Parser)]
#[command(name = "taskmill")]
#[command(about = "Database-backed work queue with process-isolated workers")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// SQLite database URL.
    #[arg(
        long,
        env = "TASKMILL_DATABASE_URL",
        default_value = DEFAULT_DATABASE_URL,
        global = true
    )]
    pub database_url: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Dispatch a new task onto the queue.
    Dispatch(DispatchArgs),

    /// Show a single task by id.
    Peek(PeekArgs),

    /// List tasks, newest first.
    List(ListArgs),

    /// Show per-status queue counts.
    Status(StatusArgs),

    /// Delete finished tasks last touched at or before a cutoff.
    Clean(CleanArgs),

    /// Mark stale processing tasks as failed.
    Dead(DeadArgs),

    /// Run a worker loop until shutdown or its time budget runs out.
    Worker(WorkerArgs),

    /// Execute one claimed task in this process.
    ///
    /// Spawned by `worker` for each claimed task; not meant to be
    /// invoked by hand.
    #[command(name = "exec-task", hide = true)]
    ExecTask(ExecTaskArgs),
}

/// Arguments for `taskmill dispatch`.
#[derive(Parser, Debug)]
pub struct DispatchArgs {
    /// Handler type for the task.
    #[arg(short = 't', long)]
    pub task_type: String,

    /// Optional human-readable name.
    #[arg(short, long, default_value = "")]
    pub name: String,

    /// JSON payload map.
    #[arg(short, long, default_value = "{}")]
    pub data: String,
}

/// Arguments for `taskmill peek`.
#[derive(Parser, Debug)]
pub struct PeekArgs {
    /// Task id.
    pub id: i64,
}

/// Arguments for `taskmill list`.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Comma-separated statuses to include (queued, processing, complete, failed).
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<String>,

    /// Comma-separated task types to include.
    #[arg(long = "task-type", value_delimiter = ',')]
    pub task_types: Vec<String>,

    /// Maximum number of rows.
    #[arg(long, default_value = "50")]
    pub limit: u32,
}

/// Arguments for `taskmill status`.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Restrict the aggregate to one task type.
    #[arg(short = 't', long)]
    pub task_type: Option<String>,
}

/// Arguments for `taskmill clean`.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Cutoff: RFC3339 timestamp or unix seconds.
    #[arg(long)]
    pub before: String,

    /// Keep failed tasks; delete only complete ones.
    #[arg(long)]
    pub keep_failed: bool,
}

/// Arguments for `taskmill dead`.
#[derive(Parser, Debug)]
pub struct DeadArgs {
    /// Cutoff: RFC3339 timestamp or unix seconds.
    #[arg(long)]
    pub before: String,
}

/// Arguments for `taskmill worker`.
#[derive(Parser, Debug)]
pub struct WorkerArgs {
    /// Seconds the loop may run before self-terminating.
    #[arg(long, default_value = "100")]
    pub max_execution_time: u64,

    /// Seconds to sleep between empty claim attempts.
    #[arg(long, default_value = "1.0")]
    pub poll_interval: f64,
}

/// Arguments for the hidden `exec-task` subcommand.
#[derive(Parser, Debug)]
pub struct ExecTaskArgs {
    /// Id of the already-claimed task to execute.
    #[arg(long)]
    pub task_id: i64,
}

/// Parses command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Runs the CLI with already-parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    let queue = TaskQueue::connect(&cli.database_url)
        .await
        .with_context(|| format!("could not open task store at {}", cli.database_url))?;

    match cli.command {
        Commands::Dispatch(args) => dispatch(&queue, args).await,
        Commands::Peek(args) => peek(&queue, args).await,
        Commands::List(args) => list(&queue, args).await,
        Commands::Status(args) => status(&queue, args).await,
        Commands::Clean(args) => clean(&queue, args).await,
        Commands::Dead(args) => dead(&queue, args).await,
        Commands::Worker(args) => run_worker(queue, args).await,
        Commands::ExecTask(args) => exec_task(&queue, args).await,
    }
}

async fn dispatch(queue: &TaskQueue, args: DispatchArgs) -> anyhow::Result<()> {
    let data: serde_json::Value =
        serde_json::from_str(&args.data).context("payload is not valid JSON")?;

    let id = queue.dispatch(&args.task_type, &args.name, data).await?;
    println!("{}", id);

    Ok(())
}

async fn peek(queue: &TaskQueue, args: PeekArgs) -> anyhow::Result<()> {
    match queue.peek(args.id).await? {
        Some(task) => {
            println!("{}", serde_json::to_string_pretty(&task)?);
            Ok(())
        }
        None => anyhow::bail!("task {} not found", args.id),
    }
}

async fn list(queue: &TaskQueue, args: ListArgs) -> anyhow::Result<()> {
    let mut filter = ListFilter::new().with_limit(args.limit);
    filter.statuses = parse_statuses(&args.status)?;
    filter.task_types = args.task_types;

    for task in queue.list(&filter).await? {
        println!(
            "{:>8}  {:<12}  {:<20}  {:<24}  {}",
            task.id,
            task.status,
            task.task_type,
            task.name,
            task.created.to_rfc3339()
        );
    }

    Ok(())
}

async fn status(queue: &TaskQueue, args: StatusArgs) -> anyhow::Result<()> {
    let summary = queue.status(args.task_type.as_deref()).await?;

    for (status, entry) in summary {
        let oldest = entry
            .oldest
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let latest = entry
            .latest
            .map(|ts| ts.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<12}  {:>8}  oldest={}  latest={}",
            status, entry.items, oldest, latest
        );
    }

    Ok(())
}

async fn clean(queue: &TaskQueue, args: CleanArgs) -> anyhow::Result<()> {
    let before = parse_cutoff(&args.before)?;
    let deleted = queue.clean(before, !args.keep_failed).await?;
    println!("{}", deleted);

    Ok(())
}

async fn dead(queue: &TaskQueue, args: DeadArgs) -> anyhow::Result<()> {
    let before = parse_cutoff(&args.before)?;
    let reaped = queue.dead(before).await?;
    println!("{}", reaped);

    Ok(())
}

async fn run_worker(queue: TaskQueue, args: WorkerArgs) -> anyhow::Result<()> {
    let config = WorkerConfig::default()
        .with_max_execution_time(std::time::Duration::from_secs(args.max_execution_time))
        .with_poll_interval(std::time::Duration::from_secs_f64(args.poll_interval));

    let worker = Worker::new(queue, config);
    worker.run().await?;

    Ok(())
}

async fn exec_task(queue: &TaskQueue, args: ExecTaskArgs) -> anyhow::Result<()> {
    let registry = builtin_registry();
    worker::run_task(queue, &registry, args.task_id).await?;

    Ok(())
}

/// Parses status names from the command line.
fn parse_statuses(names: &[String]) -> anyhow::Result<Vec<TaskStatus>> {
    names
        .iter()
        .map(|name| {
            TaskStatus::from_str(name)
                .with_context(|| format!("unknown status '{}'", name))
        })
        .collect()
}

/// Parses a cutoff timestamp: unix seconds or RFC3339.
fn parse_cutoff(input: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(seconds) = input.parse::<i64>() {
        return Utc
            .timestamp_opt(seconds, 0)
            .single()
            .with_context(|| format!("'{}' is not a valid unix timestamp", input));
    }

    let parsed = DateTime::parse_from_rfc3339(input)
        .with_context(|| format!("'{}' is neither unix seconds nor an RFC3339 timestamp", input))?;

    Ok(parsed.with_timezone(&Utc))
}
