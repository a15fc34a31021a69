//! Operational command line for Rollcall crawls.
//!
//! Thin wrapper over the engine lifecycle: start, resume, stop, and
//! inspect a region's crawl, or run workers in the foreground.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rollcall_core::{AppConfig, RegionId};
use rollcall_db::Database;
use rollcall_engine::{CrawlStateMachine, WorkerPool};
use rollcall_queue::SqliteTaskQueue;
use rollcall_region::RegionRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rollcall", about = "Incarceration roster crawl orchestrator", version)]
struct Cli {
    /// Path to a config file; defaults to the platform config dir
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a fresh crawl of a region from its seed query
    Start {
        /// Region code, e.g. us_ny
        region: String,
    },
    /// Resume a region's crawl from its last recorded cursor
    Resume {
        /// Region code, e.g. us_ny
        region: String,
    },
    /// Stop a region's crawl and drain its queue partition
    Stop {
        /// Region code, e.g. us_ny
        region: String,
    },
    /// Show a region's session and queue state
    Status {
        /// Region code, e.g. us_ny
        region: String,
    },
    /// Run crawl workers for a region in the foreground
    Run {
        /// Region code, e.g. us_ny
        region: String,
    },
}

/// Registry of compiled-in region adapters.
fn adapter_registry() -> RegionRegistry {
    RegionRegistry::new()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::load_with_env().context("loading config")?,
    };

    let db = Database::new(&config.database.path, config.database.max_connections)
        .await
        .context("opening database")?;
    db.run_migrations().await.context("running migrations")?;

    let queue = Arc::new(SqliteTaskQueue::new(db.pool().clone()));
    let registry = adapter_registry();
    let scraping = config.scraping.clone();
    let machine = Arc::new(CrawlStateMachine::new(db, queue, registry.clone(), config));

    match cli.command {
        Command::Start { region } => {
            let region = parse_region(&region)?;
            machine.start(&region).await?;
            println!("crawl started for {region}");
        }
        Command::Resume { region } => {
            let region = parse_region(&region)?;
            machine.resume(&region).await?;
            println!("crawl resumed for {region}");
        }
        Command::Stop { region } => {
            let region = parse_region(&region)?;
            let purged = machine.stop(&region).await?;
            println!("crawl stopped for {region}; {purged} tasks purged");
        }
        Command::Status { region } => {
            let region = parse_region(&region)?;
            let status = machine.status(&region).await?;

            match status.session {
                Some(session) => {
                    println!("region:   {region}");
                    println!("session:  open since {}", session.start_time.to_rfc3339());
                    println!(
                        "cursor:   {}",
                        session.last_scraped.as_deref().unwrap_or("(none yet)")
                    );
                }
                None => {
                    println!("region:   {region}");
                    println!("session:  none open");
                }
            }
            println!("pending:  {} tasks", status.pending_tasks);
        }
        Command::Run { region } => {
            let region = parse_region(&region)?;
            if !registry.contains(&region) {
                bail!("no adapter compiled in for region '{region}'");
            }

            let mut pool = WorkerPool::new(machine);
            pool.spawn_region(
                &region,
                scraping.workers_per_region,
                Duration::from_secs(scraping.lease_secs),
            );

            tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
            tracing::info!("shutting down workers");
            pool.shutdown();
            pool.join().await;
        }
    }

    Ok(())
}

fn parse_region(raw: &str) -> anyhow::Result<RegionId> {
    RegionId::new(raw).with_context(|| format!("invalid region code '{raw}'"))
}
