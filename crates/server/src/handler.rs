//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the gateway.
use std::sync::Arc;

use offline_gateway_client::HttpFetcher;
use offline_gateway_core::{CacheGateway, SqliteCacheStore};

use crate::tools::cache::{CacheGetParams, get_impl};
use crate::tools::gateway_fetch::{GatewayFetchParams, fetch_impl};
use crate::tools::gateway_status::status_impl;

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

/// Gateway over the SQLite store and the reqwest fetcher.
pub type Gateway = CacheGateway<SqliteCacheStore, HttpFetcher>;

/// The main MCP server handler for the offline gateway.
#[derive(Clone)]
pub struct GatewayServer {
    tool_router: ToolRouter<Self>,
    gateway: Arc<Gateway>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl GatewayServer {
    /// Create a new server handler around an installed gateway.
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { tool_router: Self::tool_router(), gateway }
    }

    /// Route a request through the gateway.
    ///
    /// Static assets are served cache-first, API calls network-first with an
    /// offline JSON fallback, and pages stale-while-revalidate.
    #[tool(
        description = "Fetch a URL through the offline cache gateway. Returns status, headers, body, request class and whether the response came from cache, network or the offline fallback."
    )]
    async fn gateway_fetch(&self, params: Parameters<GatewayFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&*self.gateway, params.0).await
    }

    #[tool(description = "Report cache version, control state, live cache generations and hit/miss counters.")]
    async fn gateway_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&*self.gateway).await
    }

    /// Read the current generation's entry for a URL. No network requests are made.
    #[tool(description = "Read the cached response for a URL from the current cache generation without fetching.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&*self.gateway, params.0).await
    }
}

impl ServerHandler for GatewayServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "offline-gateway".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!("Offline cache gateway for {} (cache {}).", self.gateway.origin(), self.gateway.version())),
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
