//! Host-to-worker messages.

use serde::{Deserialize, Serialize};

use super::batch::{BatchReport, each_independent};
use super::lifecycle::{ActivateReport, add};
use super::url::resolve;
use super::{WorkerContext, WorkerState};
use crate::Error;
use crate::cache::PartitionStats;

/// A message posted to the worker by a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Activate a waiting worker now.
    SkipWaiting,
    GetCacheStatus,
    /// Cache the given same-origin URLs in the dynamic partition.
    PrefetchUrls { urls: Vec<String> },
    /// Delete every partition, current ones included.
    ClearCaches,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageReply {
    SkipWaiting {
        state: WorkerState,
        /// Present when this message caused the activation.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        activation: Option<ActivateReport>,
    },
    CacheStatus(CacheStatus),
    Prefetched(BatchReport<String>),
    CachesCleared { deleted: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatus {
    pub version: String,
    pub state: WorkerState,
    pub static_cache: String,
    pub dynamic_cache: String,
    pub partitions: Vec<PartitionStats>,
}

/// Describe every partition currently in storage.
pub async fn cache_status(ctx: &WorkerContext, state: WorkerState) -> Result<CacheStatus, Error> {
    let mut partitions = Vec::new();
    for name in ctx.storage.list_partitions().await? {
        if let Some(stats) = ctx.storage.partition_stats(&name).await? {
            partitions.push(stats);
        }
    }

    Ok(CacheStatus {
        version: ctx.config.version.clone(),
        state,
        static_cache: ctx.config.static_cache.clone(),
        dynamic_cache: ctx.config.dynamic_cache.clone(),
        partitions,
    })
}

/// Fetch and store each URL independently into the dynamic partition.
///
/// Cross-origin URLs are refused; a bad entry never stops the rest.
pub async fn prefetch(ctx: &WorkerContext, urls: Vec<String>) -> Result<BatchReport<String>, Error> {
    if urls.is_empty() {
        return Err(Error::InvalidInput("PREFETCH_URLS needs at least one URL".into()));
    }

    let partition = ctx.config.dynamic_cache.clone();
    ctx.storage.open_partition(&partition).await?;

    let report = each_independent(urls, |raw| {
        let partition = &partition;
        async move {
            let url = resolve(&ctx.config.origin, &raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
            if url.origin() != ctx.config.origin.origin() {
                return Err(Error::InvalidUrl(format!("{url} is not same-origin")));
            }
            add(ctx, partition, url).await
        }
    })
    .await;

    tracing::info!(
        partition = %partition,
        cached = report.succeeded.len(),
        failed = report.failed.len(),
        "prefetched"
    );
    Ok(report)
}

/// Delete every partition in storage.
pub async fn clear_caches(ctx: &WorkerContext) -> Result<Vec<String>, Error> {
    let mut deleted = Vec::new();
    for name in ctx.storage.list_partitions().await? {
        if ctx.storage.delete_partition(&name).await? {
            deleted.push(name);
        }
    }
    tracing::info!(count = deleted.len(), "cleared caches");
    Ok(deleted)
}
