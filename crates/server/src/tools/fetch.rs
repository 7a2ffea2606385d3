//! fetch tool implementation.
//!
//! Sends one request through the worker, exactly as a page on the origin
//! would, and reports where the answer came from.

use std::collections::HashMap;

use http::{HeaderName, HeaderValue, Method};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use swcache_core::worker::url::resolve;
use swcache_core::{Error, Event, EventOutcome, Request, RequestMode, ResponseSource, Worker};

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the worker's origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET is ever cached.
    #[serde(default)]
    pub method: Option<String>,

    /// Issue the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Extra request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Include the response body as text (default: true).
    #[serde(default = "default_true")]
    pub include_body: bool,
}

fn default_true() -> bool {
    true
}

/// Output structure for the fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    /// URL of the response.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Network, cache, offline page, or pass-through.
    pub source: ResponseSource,
    /// Partition the response was read from or written to.
    pub partition: Option<String>,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Body size in bytes.
    pub bytes: usize,
    /// Body as text (lossy UTF-8).
    pub body: Option<String>,
}

/// Implementation of the fetch tool.
pub async fn fetch_impl(worker: &Worker, params: FetchParams) -> Result<CallToolResult, McpError> {
    json_result(&run_fetch(worker, params).await?)
}

pub(crate) async fn run_fetch(worker: &Worker, params: FetchParams) -> Result<FetchOutput, McpError> {
    let request = build_request(worker, &params)?;

    let served = match worker.dispatch(Event::Fetch(request)).await? {
        EventOutcome::Response(served) => served,
        other => return Err(Error::InvalidInput(format!("unexpected outcome: {other:?}")).into()),
    };

    let response = served.response;
    Ok(FetchOutput {
        url: response.url.to_string(),
        status: response.status.as_u16(),
        source: served.source,
        partition: served.partition,
        content_type: response.content_type().map(str::to_string),
        bytes: response.body.len(),
        body: params.include_body.then(|| response.text()),
    })
}

fn build_request(worker: &Worker, params: &FetchParams) -> Result<Request, McpError> {
    let url = resolve(&worker.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let method = match params.method.as_deref() {
        None => Method::GET,
        Some(m) => Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("invalid method: {m}")))?,
    };

    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::default() };
    let mut request = Request::new(method, url).with_mode(mode);

    for (name, value) in &params.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ToolError::InvalidInput(format!("invalid header name: {name}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|_| ToolError::InvalidInput(format!("invalid header value: {value}")))?;
        request = request.with_header(name, value);
    }

    Ok(request)
}
