//! Background sync.

use serde::{Deserialize, Serialize};

use super::WorkerContext;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The tag matched and the sync hook ran.
    Ran,
    /// Unknown tag; nothing happened.
    Ignored,
}

/// Handle a sync event. Only the configured tag does anything.
pub async fn handle_sync(ctx: &WorkerContext, tag: &str) -> Result<SyncOutcome, Error> {
    if tag != ctx.config.sync_tag {
        tracing::debug!(tag, "ignoring sync for unknown tag");
        return Ok(SyncOutcome::Ignored);
    }

    run_background_sync(ctx).await?;
    Ok(SyncOutcome::Ran)
}

// Queued offline writes are not replayed yet; the hook only records that it ran.
async fn run_background_sync(ctx: &WorkerContext) -> Result<(), Error> {
    tracing::info!(tag = %ctx.config.sync_tag, "background sync");
    Ok(())
}
