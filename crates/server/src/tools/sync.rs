//! sync tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::worker::SyncOutcome;
use swcache_core::{Event, EventOutcome, Worker};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncParams {
    /// Sync registration tag (default: the configured background sync tag).
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncOutput {
    pub tag: String,
    pub outcome: SyncOutcome,
}

/// Implementation of the sync tool.
pub async fn sync_impl(worker: &Worker, params: SyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| worker.config().sync_tag.clone());

    match worker.dispatch(Event::Sync { tag: tag.clone() }).await? {
        EventOutcome::Synced(outcome) => json_result(&SyncOutput { tag, outcome }),
        other => Err(ToolError::InvalidInput(format!("unexpected outcome: {other:?}")).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::worker;

    #[tokio::test]
    async fn test_sync_default_and_other_tags() {
        let (worker, _net, _) = worker().await;
        assert!(sync_impl(&worker, SyncParams { tag: None }).await.is_ok());
        assert!(sync_impl(&worker, SyncParams { tag: Some("cart-sync".into()) }).await.is_ok());
    }
}
