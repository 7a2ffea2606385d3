//! push and notification_click tools.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::{Event, EventOutcome, Worker};

use super::json_result;
use crate::error::ToolError;
use crate::notify::NotificationCenter;

/// Parameters for the push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PushParams {
    /// Push message body, normally `{title, body, icon, tag, data: {url}}`.
    /// Omitted or malformed payloads fall back to the configured defaults.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Tag of a notification shown earlier.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickOutput {
    pub tag: String,
    /// Window opened for the click, if any.
    pub opened: Option<String>,
}

/// Implementation of the push tool.
pub async fn push_impl(worker: &Worker, params: PushParams) -> Result<CallToolResult, McpError> {
    let data = params.payload.map(|v| v.to_string().into());

    match worker.dispatch(Event::Push { data }).await? {
        EventOutcome::NotificationShown(notification) => json_result(&notification),
        other => Err(ToolError::InvalidInput(format!("unexpected outcome: {other:?}")).into()),
    }
}

/// Implementation of the notification_click tool.
pub async fn click_impl(
    worker: &Worker, notifications: &Arc<NotificationCenter>, params: NotificationClickParams,
) -> Result<CallToolResult, McpError> {
    json_result(&click(worker, notifications, params).await?)
}

pub(crate) async fn click(
    worker: &Worker, notifications: &Arc<NotificationCenter>, params: NotificationClickParams,
) -> Result<NotificationClickOutput, McpError> {
    let notification = notifications
        .get(&params.tag)
        .await
        .ok_or_else(|| ToolError::UnknownNotification(params.tag.clone()))?;

    match worker.dispatch(Event::NotificationClick(notification)).await? {
        EventOutcome::NotificationClicked { opened } => {
            Ok(NotificationClickOutput { tag: params.tag, opened: opened.map(|u| u.to_string()) })
        }
        other => Err(ToolError::InvalidInput(format!("unexpected outcome: {other:?}")).into()),
    }
}
