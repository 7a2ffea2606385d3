//! Host message tools: skip_waiting, cache_status, prefetch, clear_caches.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::worker::{Message, MessageReply};
use swcache_core::{Event, EventOutcome, Worker};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the prefetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PrefetchParams {
    /// Same-origin URLs or paths to cache in the dynamic partition.
    pub urls: Vec<String>,
}

/// Post a message to the worker and render its reply.
pub async fn message_impl(worker: &Worker, message: Message) -> Result<CallToolResult, McpError> {
    json_result(&post(worker, message).await?)
}

pub async fn prefetch_impl(worker: &Worker, params: PrefetchParams) -> Result<CallToolResult, McpError> {
    if params.urls.iter().all(|u| u.trim().is_empty()) {
        return Err(ToolError::InvalidInput("urls cannot be empty".into()).into());
    }
    message_impl(worker, Message::PrefetchUrls { urls: params.urls }).await
}

pub(crate) async fn post(worker: &Worker, message: Message) -> Result<MessageReply, McpError> {
    match worker.dispatch(Event::Message(message)).await? {
        EventOutcome::Reply(reply) => Ok(reply),
        other => Err(ToolError::InvalidInput(format!("unexpected outcome: {other:?}")).into()),
    }
}
