//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use offline_gateway_core::{CacheGateway, Error, Fetcher, GatewayRequest, MemoryCacheStore, StoredResponse};
use rmcp::model::CallToolResult;
use serde::de::DeserializeOwned;
use url::Url;

/// Fetcher answering by path; unknown paths fail like a dropped connection.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, (u16, String)>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.routes.lock().unwrap().insert(path.to_string(), (status, body.to_string()));
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> Result<StoredResponse, Error> {
        let route = self.routes.lock().unwrap().get(request.url.path()).cloned();
        match route {
            Some((status, body)) => Ok(StoredResponse::new(status, vec![("content-type".into(), "text/html".into())], body)),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

/// Installed and activated gateway over an in-memory store.
pub async fn active_gateway(fetcher: StubFetcher) -> CacheGateway<MemoryCacheStore, StubFetcher> {
    fetcher.respond("/", 200, "<html>home</html>");
    fetcher.respond("/manifest.json", 200, "{\"name\":\"Super-Tool\"}");

    let gateway = CacheGateway::new(
        Arc::new(MemoryCacheStore::new()),
        Arc::new(fetcher),
        Url::parse("http://localhost:3000/").unwrap(),
        "super-tool-v1",
        vec!["/".into(), "/manifest.json".into()],
    );
    gateway.handle_install().await.unwrap();
    gateway.handle_activate().await.unwrap();
    gateway
}

/// Parse the JSON text payload of a tool result.
pub fn output_of<T: DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
