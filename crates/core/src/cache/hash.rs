//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

use crate::GatewayRequest;

/// Compute the cache key for a request identity (method + canonical URL).
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache key for an intercepted request.
pub fn request_key(request: &GatewayRequest) -> String {
    compute_request_key(&request.method, request.url.as_str())
}
