//! # Hivesched — Task Scheduling & Dispatch Engine
//!
//! Scans the task store for due tasks and dispatches them to the hive:
//! templated messages, channel polls, and agentic config queries.
//!
//! Usage:
//!   hivesched                      # Run the interval scan loop
//!   hivesched --once               # One pass, print the JSON summary
//!   hivesched --interval 60        # Override the scan interval

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hivesched_channels::DronebotClient;
use hivesched_core::config::HiveConfig;
use hivesched_core::traits::{DroneStore, Notifier, Provider, RoleDirectory, TaskStore};
use hivesched_scheduler::{FileDroneStore, FileTaskStore, SchedulerEngine};

#[derive(Parser)]
#[command(
    name = "hivesched",
    version,
    about = "🐝 Hivesched — Task Scheduling & Dispatch Engine"
)]
struct Cli {
    /// Config file path (default: ~/.hivesched/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Run one scheduler pass, print the run summary as JSON, and exit
    #[arg(long)]
    once: bool,

    /// Seconds between scans (overrides the configured interval)
    #[arg(long)]
    interval: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(p).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "hivesched=debug,hivesched_scheduler=debug,hivesched_channels=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => HiveConfig::load_from(&expand_path(path))?,
        None => HiveConfig::load()?,
    };

    let store_dir = expand_path(&config.scheduler.store_dir);
    std::fs::create_dir_all(&store_dir)?;

    let store: Arc<dyn TaskStore> = Arc::new(FileTaskStore::open(store_dir.join("tasks.json"))?);
    let drones: Arc<dyn DroneStore> =
        Arc::new(FileDroneStore::open(store_dir.join("drones.json"))?);
    let bot = Arc::new(DronebotClient::new(config.dronebot.clone()));
    let notifier: Arc<dyn Notifier> = bot.clone();
    let roles: Arc<dyn RoleDirectory> = bot;
    let provider: Arc<dyn Provider> =
        Arc::from(hivesched_providers::create_provider(&config.reasoning)?);

    let engine = SchedulerEngine::new(store, roles, notifier, provider, drones, &config);

    if cli.once {
        let summary = engine.run_once().await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let interval_secs = cli.interval.unwrap_or(config.scheduler.check_interval_secs);
    println!("🐝 Hivesched v{}", env!("CARGO_PKG_VERSION"));
    println!("   📂 Store:    {}", store_dir.display());
    println!("   🤖 Dronebot: {}", config.dronebot.base_url);
    println!("   🧠 Model:    {}", config.reasoning.model);
    println!("   ⏱️  Interval: {interval_secs}s");
    println!();

    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
    loop {
        ticker.tick().await;
        if let Err(e) = engine.run_once().await {
            tracing::error!("⚠️ Scheduler pass failed: {e}");
        }
    }
}
