//! cache_get tool implementation.
//!
//! Reads the entry the current generation holds for a request, without
//! touching the network.

use offline_gateway_core::{CacheGateway, CacheStore, Error, Fetcher, cache::hash::request_key};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::gateway_fetch::HeaderEntry;
use crate::tools::request_for;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the gateway origin.
    pub url: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    pub key_hash: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<HeaderEntry>,
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<S: CacheStore, F: Fetcher>(
    gateway: &CacheGateway<S, F>, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let request = request_for(gateway.origin(), "GET", &params.url)?;
    let cache = gateway.current_cache();

    let response = cache
        .lookup(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.identity()))?;

    let output = CacheGetOutput {
        generation: cache.name().to_string(),
        key_hash: request_key(&request),
        url: request.url.to_string(),
        status: response.status,
        headers: response
            .headers
            .into_iter()
            .map(|(name, value)| HeaderEntry { name, value })
            .collect(),
        body: String::from_utf8_lossy(&response.body).to_string(),
        body_bytes: response.body.len(),
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{StubFetcher, active_gateway, output_of};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let gateway = active_gateway(StubFetcher::new()).await;
        let params = CacheGetParams { url: "/static/missing.css".to_string() };

        let err = get_impl(&gateway, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_manifest_entry() {
        let gateway = active_gateway(StubFetcher::new()).await;
        let params = CacheGetParams { url: "/manifest.json".to_string() };

        let output: CacheGetOutput = output_of(&get_impl(&gateway, params).await.unwrap());

        assert_eq!(output.generation, "super-tool-v1");
        assert_eq!(output.url, "http://localhost:3000/manifest.json");
        assert_eq!(output.status, 200);
        assert_eq!(output.body, "{\"name\":\"Super-Tool\"}");
        assert_eq!(output.key_hash.len(), 64);
    }

    #[tokio::test]
    async fn test_get_impl_absolute_url() {
        let gateway = active_gateway(StubFetcher::new()).await;
        let params = CacheGetParams { url: "http://LOCALHOST:3000/#top".to_string() };

        let output: CacheGetOutput = output_of(&get_impl(&gateway, params).await.unwrap());
        assert_eq!(output.body, "<html>home</html>");
    }
}
