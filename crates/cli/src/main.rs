//! swcache CLI - drive the cache worker from a terminal.
//!
//! Commands:
//! - `swcache install` - Precache the shell and activate when skip-waiting is on
//! - `swcache activate` - Prune partitions of older versions
//! - `swcache status [--entries]` - Show partitions and worker state
//! - `swcache fetch <url>` - Send one request through the worker
//! - `swcache prefetch <url>...` - Cache URLs in the dynamic partition
//! - `swcache clear` - Delete every partition

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use swcache_client::{FetchClient, FetchConfig, LogNotifier, OfflineNetwork};
use swcache_core::worker::Message;
use swcache_core::{
    AppConfig, CacheDb, CacheStorage, Event, EventOutcome, Network, Request, SnapshotSummary, Worker, WorkerConfig,
    WorkerContext, WorkerState,
};
use tracing_subscriber::EnvFilter;

/// Request cache worker CLI
#[derive(Parser)]
#[command(name = "swcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (overrides SWCACHE_CONFIG_FILE)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Precache the shell routes and static assets
    Install,

    /// Delete partitions that do not belong to the current version
    Activate,

    /// Show the worker state and every partition
    Status {
        /// Also list the entries stored in each partition
        #[arg(long)]
        entries: bool,
    },

    /// Send one request through the worker and print the response
    Fetch {
        /// URL or origin-relative path
        url: String,

        /// Treat the request as a page navigation
        #[arg(long)]
        navigate: bool,

        /// Serve from cache only; every network call fails
        #[arg(long)]
        offline: bool,

        /// Print response metadata only
        #[arg(long)]
        head: bool,
    },

    /// Cache URLs in the dynamic partition
    Prefetch {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Delete every partition
    Clear,
}

#[derive(Serialize)]
struct FetchSummary {
    url: String,
    status: u16,
    source: swcache_core::ResponseSource,
    partition: Option<String>,
    content_type: Option<String>,
    bytes: usize,
}

#[derive(Serialize)]
struct PartitionListing {
    partition: String,
    entries: Vec<SnapshotSummary>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let app = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from(Some(path)),
        None => AppConfig::load(),
    }
    .context("loading configuration")?;

    run(cli.command, &app).await
}

async fn run(command: Commands, app: &AppConfig) -> Result<()> {
    let offline = matches!(command, Commands::Fetch { offline: true, .. });
    let worker = open_worker(app, offline).await?;
    tracing::debug!(state = ?worker.state().await, offline, db = %app.db_path.display(), "opened worker");

    match command {
        Commands::Install => {
            let installed = worker.dispatch(Event::Install).await?;
            print_json(&outcome_json(&installed)?)?;
            if worker.config().skip_waiting {
                let activated = worker.dispatch(Event::Activate).await?;
                print_json(&outcome_json(&activated)?)?;
            }
        }
        Commands::Activate => {
            if worker.state().await == WorkerState::Parsed {
                bail!("version {} is not installed; run `swcache install` first", worker.config().version);
            }
            let activated = worker.dispatch(Event::Activate).await?;
            print_json(&outcome_json(&activated)?)?;
        }
        Commands::Status { entries } => {
            print_json(&worker.on_message(Message::GetCacheStatus).await?)?;
            if entries {
                print_json(&list_entries(&worker).await?)?;
            }
        }
        Commands::Fetch { url, navigate, head, .. } => {
            let url = swcache_core::worker::url::resolve(&worker.config().origin, &url)?;
            let request = if navigate { Request::navigate(url) } else { Request::get(url) };
            let served = worker.fetch(request).await?;

            let response = &served.response;
            print_json(&FetchSummary {
                url: response.url.to_string(),
                status: response.status.as_u16(),
                source: served.source,
                partition: served.partition.clone(),
                content_type: response.content_type().map(str::to_string),
                bytes: response.body.len(),
            })?;
            if !head {
                println!("{}", response.text());
            }
        }
        Commands::Prefetch { urls } => print_json(&worker.on_message(Message::PrefetchUrls { urls }).await?)?,
        Commands::Clear => print_json(&worker.on_message(Message::ClearCaches).await?)?,
    }

    Ok(())
}

/// Resume the worker for the configured version against the on-disk store.
async fn open_worker(app: &AppConfig, offline: bool) -> Result<Worker> {
    let config = WorkerConfig::from_app(app)?;
    let db = CacheDb::open(&app.db_path)
        .await
        .with_context(|| format!("opening {}", app.db_path.display()))?;

    let network: Arc<dyn Network> =
        if offline { Arc::new(OfflineNetwork) } else { Arc::new(FetchClient::new(FetchConfig::from(app))?) };

    let ctx = WorkerContext::new(config, Arc::new(db), network, Arc::new(LogNotifier));
    Ok(Worker::resume(ctx).await?)
}

async fn list_entries(worker: &Worker) -> Result<Vec<PartitionListing>> {
    let storage = &worker.context().storage;
    let mut listings = Vec::new();
    for partition in storage.list_partitions().await? {
        let entries = storage.list_entries(&partition).await?;
        listings.push(PartitionListing { partition, entries });
    }
    Ok(listings)
}

fn outcome_json(outcome: &EventOutcome) -> Result<serde_json::Value> {
    let value = match outcome {
        EventOutcome::Installed(report) => serde_json::to_value(report)?,
        EventOutcome::Activated(report) => serde_json::to_value(report)?,
        other => bail!("unexpected outcome: {other:?}"),
    };
    Ok(value)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swcache_core::testing::{shop_url, test_app_config};

    #[test]
    fn test_parse_fetch_flags() {
        let cli = Cli::try_parse_from(["swcache", "fetch", "/product/42", "--navigate", "--offline"]).unwrap();
        let Commands::Fetch { url, navigate, offline, head } = cli.command else { panic!("expected fetch") };
        assert_eq!(url, "/product/42");
        assert!(navigate && offline && !head);
    }

    #[test]
    fn test_prefetch_requires_urls() {
        assert!(Cli::try_parse_from(["swcache", "prefetch"]).is_err());
        let cli = Cli::try_parse_from(["swcache", "-v", "prefetch", "/a", "/b"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Prefetch { urls } if urls.len() == 2));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["swcache", "status", "--config", "swcache.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("swcache.toml"));
        assert!(matches!(cli.command, Commands::Status { entries: false }));
    }

    #[tokio::test]
    async fn test_list_entries_per_partition() {
        let config = WorkerConfig::from_app(&test_app_config()).unwrap();
        let db = CacheDb::open_in_memory().await.unwrap();
        let ctx = WorkerContext::new(config, Arc::new(db), Arc::new(OfflineNetwork), Arc::new(LogNotifier));
        let request = Request::get(shop_url("/cart"));
        let response = swcache_core::Response::new(shop_url("/cart"), http::StatusCode::OK, "cart".into());
        ctx.storage.store(&ctx.config.static_cache, &request, &response).await.unwrap();

        let listings = list_entries(&Worker::new(ctx)).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].partition, "storefront-static-v1");
        assert_eq!(listings[0].entries[0].url, "https://shop.test/cart");
        assert_eq!(listings[0].entries[0].bytes, 4);
    }
}
