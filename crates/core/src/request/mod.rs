//! Request and response values that flow through the gateway.
//!
//! Bodies are held as [`Bytes`], so handing a copy to a cache write never
//! consumes the caller's response.

pub mod url;

use bytes::Bytes;
use serde_json::json;

pub use self::url::{UrlError, canonicalize, resolve};

use crate::Error;

/// Body returned to API callers when the network is unreachable.
pub const OFFLINE_ERROR_MESSAGE: &str = "Network unavailable";

/// Status used for the synthesized offline response.
pub const OFFLINE_STATUS: u16 = 503;

/// An intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub method: String,
    pub url: ::url::Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl GatewayRequest {
    /// Build a request for an absolute URL.
    pub fn new(method: &str, url: &str) -> Result<Self, Error> {
        let url = canonicalize(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self::from_url(method, url))
    }

    /// Build a GET request for an absolute URL.
    pub fn get(url: &str) -> Result<Self, Error> {
        Self::new("GET", url)
    }

    /// Build a request from an already canonical URL.
    pub fn from_url(method: &str, mut url: ::url::Url) -> Self {
        url.set_fragment(None);
        Self { method: method.trim().to_ascii_uppercase(), url, headers: Vec::new(), body: None }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Only GET requests take part in cache reads and writes.
    pub fn is_cacheable_method(&self) -> bool {
        self.method == "GET"
    }

    /// Human-readable request identity, e.g. `GET http://localhost:3000/`.
    pub fn identity(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// A response snapshot: status, headers and the full body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// The structured offline signal handed to API callers.
    pub fn offline() -> Self {
        let body = json!({ "error": OFFLINE_ERROR_MESSAGE, "offline": true }).to_string();
        Self {
            status: OFFLINE_STATUS,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Bytes::from(body),
        }
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only exact 200 responses are ever persisted.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_method_normalized() {
        let req = GatewayRequest::new(" post ", "http://localhost:3000/api/convert").unwrap();
        assert_eq!(req.method, "POST");
        assert!(!req.is_cacheable_method());
        assert!(GatewayRequest::get("http://localhost:3000/").unwrap().is_cacheable_method());
    }

    #[test]
    fn test_request_identity_drops_fragment() {
        let req = GatewayRequest::get("http://localhost:3000/tools#pdf").unwrap();
        assert_eq!(req.identity(), "GET http://localhost:3000/tools");
    }

    #[test]
    fn test_request_invalid_url() {
        let result = GatewayRequest::get("not a url");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_offline_response_body() {
        let resp = StoredResponse::offline();
        let value: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(value, json!({ "error": "Network unavailable", "offline": true }));
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
        assert!(!resp.is_cacheable());
    }

    #[test]
    fn test_cacheable_only_200() {
        assert!(StoredResponse::new(200, vec![], "ok").is_cacheable());
        assert!(!StoredResponse::new(204, vec![], "").is_cacheable());
        assert!(StoredResponse::new(204, vec![], "").is_ok());
        assert!(!StoredResponse::new(404, vec![], "").is_ok());
    }
}
