//! Install and activate handlers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use url::Url;

use super::WorkerContext;
use super::batch::{BatchReport, bulk_or_each};
use super::request::{Request, Response};
use crate::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    pub partition: String,
    pub precache: BatchReport<Url>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateReport {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
}

/// Open the static partition and precache the shell routes and static assets.
///
/// Precaching is best-effort: only a storage failure opening the partition
/// fails the install.
pub async fn install(ctx: &WorkerContext) -> Result<InstallReport, Error> {
    let partition = ctx.config.static_cache.clone();
    ctx.storage.open_partition(&partition).await?;

    let urls = ctx
        .config
        .precache_paths()
        .into_iter()
        .map(|path| ctx.config.url_for(path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
        .collect::<Result<Vec<Url>, Error>>()?;

    let report = bulk_or_each(
        urls,
        |urls| add_all(ctx, &partition, urls),
        |url| add(ctx, &partition, url),
    )
    .await;

    for failure in &report.failed {
        tracing::warn!(url = %failure.item, "precache failed: {}", failure.error);
    }
    tracing::info!(
        partition = %partition,
        mode = ?report.mode,
        cached = report.succeeded.len(),
        failed = report.failed.len(),
        "installed"
    );

    Ok(InstallReport { partition, precache: report })
}

/// Delete every partition that does not belong to the current version.
pub async fn activate(ctx: &WorkerContext) -> Result<ActivateReport, Error> {
    let mut report = ActivateReport::default();

    for name in ctx.storage.list_partitions().await? {
        if ctx.config.is_current_partition(&name) {
            report.kept.push(name);
            continue;
        }
        if ctx.storage.delete_partition(&name).await? {
            tracing::info!(partition = %name, "deleted stale partition");
        }
        report.deleted.push(name);
    }

    tracing::info!(deleted = report.deleted.len(), version = %ctx.config.version, "activated");
    Ok(report)
}

/// Fetch every URL concurrently and store them together; any failure or
/// non-2xx answer rejects the whole batch and nothing is stored.
async fn add_all(ctx: &WorkerContext, partition: &str, urls: Vec<Url>) -> Result<(), Error> {
    let mut set = JoinSet::new();
    for url in urls {
        let network = Arc::clone(&ctx.network);
        set.spawn(async move {
            let request = Request::get(url);
            let response = network.fetch(&request).await?;
            ensure_success(&request, &response)?;
            Ok::<_, Error>((request, response))
        });
    }

    let mut entries = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        let entry = joined.map_err(|e| Error::Network(format!("precache task failed: {e}")))??;
        entries.push(entry);
    }

    ctx.storage.store_all(partition, &entries).await
}

/// Fetch and store a single URL.
pub(crate) async fn add(ctx: &WorkerContext, partition: &str, url: Url) -> Result<(), Error> {
    let request = Request::get(url);
    let response = ctx.network.fetch(&request).await?;
    ensure_success(&request, &response)?;
    ctx.storage.store(partition, &request, &response).await
}

fn ensure_success(request: &Request, response: &Response) -> Result<(), Error> {
    if response.is_success() {
        Ok(())
    } else {
        Err(Error::Network(format!("{} answered {}", request.url, response.status)))
    }
}
