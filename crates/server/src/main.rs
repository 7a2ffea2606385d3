//! swcache MCP server entry point.
//!
//! Boots the cache worker (install, then activate when skip-waiting is on)
//! and serves its events as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{FetchClient, FetchConfig};
use swcache_core::{AppConfig, CacheDb, Worker, WorkerConfig, WorkerContext};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod notify;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let app = AppConfig::load()?;
    let config = WorkerConfig::from_app(&app)?;

    tracing::info!(origin = %config.origin, version = %config.version, db = %app.db_path.display(), "starting swcache worker");

    let db = CacheDb::open(&app.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&app))?;
    let notifications = Arc::new(notify::NotificationCenter::new());

    let ctx = WorkerContext::new(config, Arc::new(db), Arc::new(network), notifications.clone());
    let worker = Worker::new(ctx);
    let state = worker.start().await?;
    tracing::info!(?state, "worker started, serving on stdio transport");

    let handler = handler::WorkerServer::new(Arc::new(worker), notifications);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
