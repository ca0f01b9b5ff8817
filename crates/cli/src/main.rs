//! Taskwatch CLI - supervised subagent execution with synthesized progress.

mod simulated;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use taskwatch_core::{SubagentTask, TaskId, TaskSnapshot};
use taskwatch_monitor::{CallbackHooks, Monitor, MonitorConfig, SpawnOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::simulated::SimulatedExecutor;

#[derive(Parser)]
#[command(name = "taskwatch")]
#[command(about = "Supervise long-running subagent tasks", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one task against the simulated executor
    Run {
        /// Task description
        #[arg(long)]
        task: String,
        /// Tool to make available (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,
        /// Task identifier
        #[arg(long)]
        task_id: Option<String>,
        /// Seconds between progress updates
        #[arg(long, default_value = "90")]
        interval: u64,
        /// Seconds before the task is considered stuck
        #[arg(long, default_value = "900")]
        timeout: u64,
        /// Seconds the simulated executor works for
        #[arg(long, default_value = "30")]
        duration: u64,
        /// Make the executor fail
        #[arg(long)]
        fail: bool,
        /// Make the executor report no percentage
        #[arg(long)]
        silent: bool,
    },
    /// Run several tasks concurrently, kill one, list the rest
    Demo {
        /// Seconds between progress updates
        #[arg(long, default_value = "2")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run {
            task,
            tools,
            task_id,
            interval,
            timeout,
            duration,
            fail,
            silent,
        } => {
            let executor = SimulatedExecutor {
                duration: Duration::from_secs(duration),
                fail,
                silent,
            };
            let config = MonitorConfig::new()
                .with_update_interval(Duration::from_secs(interval))
                .with_timeout_threshold(Duration::from_secs(timeout));
            let monitor = Monitor::new(Arc::new(executor), config)?;

            let mut options = SpawnOptions::new().with_hooks(printing_hooks());
            if let Some(id) = task_id {
                options = options.with_task_id(id);
            }
            let task = SubagentTask::new(task).with_tools(tools);

            let outcome = monitor.spawn_with_monitoring(task, options).await;

            for snapshot in monitor.list_tasks().await {
                print_snapshot(&snapshot);
                let summary = monitor.progress_summary(&snapshot.task_id).await?;
                println!(
                    "  Samples: {}  Rate: {:.1}%/min",
                    summary.updates, summary.rate_per_minute
                );
            }

            let result = outcome?;
            println!("Result: {result}");
        }
        Commands::Demo { interval } => demo(interval).await?,
    }

    Ok(())
}

async fn demo(interval: u64) -> Result<()> {
    let executor = SimulatedExecutor {
        duration: Duration::from_secs(interval * 4),
        fail: false,
        silent: false,
    };
    let config = MonitorConfig::new()
        .with_update_interval(Duration::from_secs(interval))
        .with_timeout_threshold(Duration::from_secs(interval * 10));
    let monitor = Arc::new(Monitor::new(Arc::new(executor), config)?);

    let jobs = [
        ("research-001", "Research renewable energy trends"),
        ("analysis-001", "Complex data analysis"),
        ("report-001", "Draft the quarterly report"),
    ];

    let mut running = Vec::new();
    for (id, description) in jobs {
        let monitor = monitor.clone();
        running.push(tokio::spawn(async move {
            let task = SubagentTask::new(description).with_tools(["web_search", "calculator"]);
            let options = SpawnOptions::new()
                .with_task_id(id)
                .with_hooks(printing_hooks());
            monitor.spawn_with_monitoring(task, options).await
        }));
    }

    tokio::time::sleep(Duration::from_secs(interval) + Duration::from_millis(500)).await;
    println!("Active tasks:");
    for snapshot in monitor.list_active_tasks().await {
        print_snapshot(&snapshot);
    }

    let victim = TaskId::from("analysis-001");
    if monitor.kill_task(&victim).await {
        info!(task_id = %victim, "killed by demo");
    }

    for outcome in futures::future::join_all(running).await {
        match outcome? {
            Ok(result) => println!("Finished: {result}"),
            Err(e) => println!("Ended: {e}"),
        }
    }

    println!("Active tasks after completion: {}", monitor.list_active_tasks().await.len());
    println!("Pruned {} finished records", monitor.prune_finished().await);
    Ok(())
}

fn printing_hooks() -> CallbackHooks {
    CallbackHooks::new()
        .on_progress(|id, pct| println!("Task {id} progress: {pct}%"))
        .on_complete(|id, _| println!("Task {id} completed"))
        .on_error(|id, err| println!("Task {id} failed: {err}"))
}

fn print_snapshot(snapshot: &TaskSnapshot) {
    println!(
        "  {} | {} | {}% | {}s | {}",
        snapshot.task_id,
        snapshot.status,
        snapshot.latest_percentage,
        snapshot.elapsed.as_secs(),
        snapshot.description,
    );
    if let Some(left) = snapshot.estimated_remaining {
        println!("  ETA: {}s", left.as_secs());
    }
}
