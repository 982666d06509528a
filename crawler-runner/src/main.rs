//! Run Log Crawler
//!
//! A long-running worker that mirrors the console output of running jobs on
//! the tracking service into local, per-owner, per-day log files.
//!
//! Architecture:
//! - Configuration: Load settings from command-line flags or environment
//! - Repositories: GraphQL communication with the tracking service
//! - Services: Incremental, deduplicating log store
//! - Scheduler: Fixed-interval polling loop
//!
//! The crawler never exits on remote or transient local errors; it logs them
//! and retries on the next cycle until it receives Ctrl-C.

mod config;
mod repository;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, DEFAULT_INTERVAL_SECS, DEFAULT_MAX_LINES, DEFAULT_STORE_PATH};
use crate::repository::GraphqlJobRepository;
use crate::scheduler::LogPoller;
use crate::service::FileLogStore;
use crawler_client::{DEFAULT_ENDPOINT, WandbClient};

#[derive(Parser)]
#[command(name = "crawler")]
#[command(about = "Mirror logs of running jobs into local per-day files", long_about = None)]
struct Cli {
    /// Account (entity) owning the project
    #[arg(long, env = "WANDB_ENTITY")]
    entity: String,

    /// Project whose running jobs are crawled
    #[arg(long, env = "WANDB_PROJECT")]
    project: String,

    /// Root directory of the log store
    #[arg(long, env = "CRAWLER_STORE_PATH", default_value = DEFAULT_STORE_PATH)]
    store_path: PathBuf,

    /// Seconds to wait between cycles
    #[arg(long, env = "CRAWLER_INTERVAL", default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: u64,

    /// GraphQL endpoint of the tracking service
    #[arg(long, env = "WANDB_API_URL", default_value = DEFAULT_ENDPOINT)]
    api_url: String,

    /// API key for private projects
    #[arg(long, env = "WANDB_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Most recent lines fetched per job and cycle
    #[arg(long, env = "CRAWLER_MAX_LINES", default_value_t = DEFAULT_MAX_LINES)]
    max_lines: u32,

    /// Crawler log file (defaults to <store-path>/crawler.log)
    #[arg(long, env = "CRAWLER_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            store_path: self.store_path,
            poll_interval: Duration::from_secs(self.interval),
            api_url: self.api_url,
            api_key: self.api_key,
            max_lines: self.max_lines,
            log_file: self.log_file,
            ..Config::new(self.entity, self.project)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let once = cli.once;
    let config = cli.into_config();
    config.validate()?;

    // The store root holds the default log file, so it must exist first
    let store = FileLogStore::open(&config.store_path).context("Failed to open log store")?;
    let _log_guard = init_logging(&config.log_file_path())?;

    info!("Starting run log crawler");
    info!(
        "Loaded configuration: project={}/{}, store={}, interval={:?}",
        config.entity,
        config.project,
        store.root().display(),
        config.poll_interval
    );

    let http = reqwest::Client::builder()
        .user_agent(concat!("crawler/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let mut client = WandbClient::with_client(config.api_url.clone(), http);
    if let Some(key) = &config.api_key {
        client = client.with_api_key(key.clone());
    }
    if !client.is_authenticated() {
        warn!("No API key configured; only public projects are readable");
    }

    let repository = Arc::new(GraphqlJobRepository::new(
        client,
        config.entity.clone(),
        config.project.clone(),
        config.max_lines,
    ));
    let poller = LogPoller::new(&config, repository, Arc::new(store));

    if once {
        return match poller.cycle().await {
            Some(_) => Ok(()),
            None => anyhow::bail!("Poll cycle failed"),
        };
    }

    poller
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await;

    Ok(())
}

/// Initializes logging to stdout and to an append-mode file
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
fn init_logging(log_file: &Path) -> Result<WorkerGuard> {
    let directory = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;

    std::fs::create_dir_all(&directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(&directory, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crawler=info,crawler_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}
