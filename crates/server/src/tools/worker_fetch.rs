//! worker_fetch tool implementation.
//!
//! Sends one request through the worker and reports which route served it.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use revcache_client::{Worker, fetch::resolve};
use revcache_core::{Destination, Error, Request};

/// Parameters for the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a site route resolved against the configured origin.
    pub url: String,

    /// Request destination (document, font, image, script, style, manifest).
    #[serde(default)]
    pub destination: Option<String>,

    /// HTTP method. Only GET requests are intercepted.
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub final_url: String,
    /// `revision-cache-first`, `cache-first` or `network`.
    pub route: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_bytes: usize,
    /// Body as text, when it is valid UTF-8.
    pub body_text: Option<String>,
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(worker: &Worker, origin: &Url, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    let url = resolve(origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::get(url);
    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(destination.parse::<Destination>()?);
    }
    if let Some(method) = params.method.as_deref() {
        request = request.with_method(method);
    }
    let url = request.url().to_string();

    let served = worker.fetch(request).await?;
    let response = served.response;

    let output = WorkerFetchOutput {
        url,
        route: served
            .strategy
            .map_or_else(|| "network".to_string(), |kind| kind.to_string()),
        status: response.status,
        content_type: response.content_type().map(str::to_string),
        body_bytes: response.body.len(),
        body_text: std::str::from_utf8(&response.body).ok().map(str::to_string),
        final_url: response.url,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
