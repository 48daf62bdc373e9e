//! MCP server handler implementation.
//!
//! Routes tool calls to the worker and to the cache partitions behind it.
use std::sync::Arc;

use crate::tools::cache::{CacheGetParams, CacheKeysParams, CachePurgeParams, get_impl, keys_impl, purge_impl};
use crate::tools::worker_activate::activate_impl;
use crate::tools::worker_fetch::{WorkerFetchParams, fetch_impl};
use revcache_client::Worker;

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
use url::Url;

#[derive(Clone)]
pub struct RevcacheServer {
    worker: Arc<Worker>,
    origin: Url,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl RevcacheServer {
    pub fn new(worker: Arc<Worker>, origin: Url) -> Self {
        Self { worker, origin, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Fetch a URL or site route through the offline worker. Manifest URLs use the revision cache, fonts and images use the runtime cache, everything else goes to the network."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.origin, params.0).await
    }

    /// Re-run activation, purging revision entries the manifest no longer names.
    #[tool(description = "Run the activate event: purge stale entries from the revision cache.")]
    async fn worker_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    #[tool(description = "List cache keys, for one cache or for every cache.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.worker.db(), params.0).await
    }

    #[tool(description = "Get a stored response by cache name and cache key.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(self.worker.db(), params.0).await
    }

    #[tool(description = "Delete one cache entry, or clear a whole cache when no key is given.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(self.worker.db(), params.0).await
    }
}

impl ServerHandler for RevcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "revcache".into(),
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
