//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the worker's event handlers.
use std::sync::Arc;

use crate::notify::NotificationCenter;
use crate::tools::{
    self, FetchParams, NotificationClickParams, PrefetchParams, PushParams, SyncParams, messages::message_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use swcache_core::Worker;
use swcache_core::worker::Message;

/// The main MCP server handler for swcache.
#[derive(Clone)]
pub struct WorkerServer {
    worker: Arc<Worker>,
    notifications: Arc<NotificationCenter>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorkerServer {
    /// Create a new server handler around a started worker.
    pub fn new(worker: Arc<Worker>, notifications: Arc<NotificationCenter>) -> Self {
        Self { worker, notifications, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Send a request through the cache worker. Same-origin GETs are served cache-first or network-first depending on the route; everything else goes straight to the network."
    )]
    async fn fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        tools::fetch::fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Activate a waiting worker now. No effect if it is already active.")]
    async fn skip_waiting(&self) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, Message::SkipWaiting).await
    }

    #[tool(description = "Report the cache version, worker state, and entry count and size of every partition.")]
    async fn cache_status(&self) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, Message::GetCacheStatus).await
    }

    #[tool(description = "Fetch same-origin URLs into the dynamic cache. Each URL succeeds or fails on its own.")]
    async fn prefetch(&self, params: Parameters<PrefetchParams>) -> Result<CallToolResult, McpError> {
        tools::messages::prefetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Delete every cache partition, current version included.")]
    async fn clear_caches(&self) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, Message::ClearCaches).await
    }

    #[tool(description = "Deliver a push message. Shows a notification built from the payload and configured defaults.")]
    async fn push(&self, params: Parameters<PushParams>) -> Result<CallToolResult, McpError> {
        tools::push::push_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click a shown notification by tag: closes it and opens its target page, if it has one.")]
    async fn notification_click(&self, params: Parameters<NotificationClickParams>) -> Result<CallToolResult, McpError> {
        tools::push::click_impl(&self.worker, &self.notifications, params.0).await
    }

    #[tool(description = "Fire a background sync event. Only the configured tag runs the sync hook.")]
    async fn sync(&self, params: Parameters<SyncParams>) -> Result<CallToolResult, McpError> {
        tools::sync::sync_impl(&self.worker, params.0).await
    }
}

impl ServerHandler for WorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "swcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
