//! MCP tool implementations.
//!
//! Every tool turns its parameters into a worker event, dispatches it, and
//! renders the outcome as pretty JSON.

pub mod fetch;
pub mod messages;
pub mod push;
pub mod sync;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use fetch::FetchParams;
pub use messages::PrefetchParams;
pub use push::{NotificationClickParams, PushParams};
pub use sync::SyncParams;

pub(crate) fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ToolError::EncodeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
