//! gateway_status tool implementation.
//!
//! Reports the active cache version, control state, live generations and
//! activity counters.

use offline_gateway_core::{CacheGateway, CacheStore, Error, Fetcher};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};

/// Implementation of the gateway_status tool.
pub async fn status_impl<S: CacheStore, F: Fetcher>(gateway: &CacheGateway<S, F>) -> Result<CallToolResult, McpError> {
    let status = gateway.status().await?;
    let json = serde_json::to_string_pretty(&status)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize status: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
