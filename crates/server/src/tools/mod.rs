//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offline gateway server.

pub mod cache;
pub mod gateway_fetch;
pub mod gateway_status;

#[cfg(test)]
pub(crate) mod test_support;

pub use gateway_fetch::{GatewayFetchOutput, GatewayFetchParams};

use offline_gateway_core::{Error, GatewayRequest, request::resolve};
use url::Url;

/// Build a request for `url`, resolving relative paths against `origin`.
pub(crate) fn request_for(origin: &Url, method: &str, url: &str) -> Result<GatewayRequest, Error> {
    let url = resolve(origin, url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
    Ok(GatewayRequest::from_url(method, url))
}
