//! gateway_fetch tool implementation.
//!
//! Routes a request through the offline cache gateway exactly as an
//! intercepted page request would be handled.

use std::collections::BTreeMap;

use offline_gateway_core::{CacheGateway, CacheStore, Error, Fetcher, RequestClass, ResponseSource, StoredResponse};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::request_for;

/// Input parameters for gateway_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayFetchParams {
    /// Absolute URL, or a path resolved against the gateway origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Optional request body.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// One response header.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// Output structure for gateway_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayFetchOutput {
    /// Canonical request URL.
    pub url: String,
    pub method: String,
    pub status: u16,
    pub headers: Vec<HeaderEntry>,
    /// Response body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
    /// Request class; absent when the gateway passed the request through.
    pub class: Option<RequestClass>,
    pub source: ResponseSource,
}

impl GatewayFetchOutput {
    pub(crate) fn build(url: String, method: String, response: StoredResponse) -> Self {
        Self {
            url,
            method,
            status: response.status,
            headers: response
                .headers
                .into_iter()
                .map(|(name, value)| HeaderEntry { name, value })
                .collect(),
            body: String::from_utf8_lossy(&response.body).to_string(),
            body_bytes: response.body.len(),
            class: None,
            source: ResponseSource::Passthrough,
        }
    }
}

/// Implementation of the gateway_fetch tool.
pub async fn fetch_impl<S: CacheStore, F: Fetcher>(
    gateway: &CacheGateway<S, F>, params: GatewayFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let mut request = request_for(gateway.origin(), &params.method, &params.url)?;
    request.headers.extend(params.headers);
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let handled = gateway.respond(&request).await?;

    let mut output = GatewayFetchOutput::build(request.url.to_string(), request.method.clone(), handled.response);
    output.class = handled.class;
    output.source = handled.source;

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
