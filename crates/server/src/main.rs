//! offline-gateway-mcp server entry point.
//!
//! Boots the gateway (install, then activate whatever generation is
//! installed for the configured version) and serves it as an MCP server
//! on stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use offline_gateway_client::{FetchConfig, HttpFetcher};
use offline_gateway_core::{AppConfig, CacheGateway, Error, SqliteCacheStore};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let db_path = config.require_db_path().context("invalid configuration")?;

    tracing::info!(origin = %config.origin, version = %config.cache_version, "Starting offline-gateway server on stdio transport");

    let store = SqliteCacheStore::open(db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", db_path.display()))?;
    let fetcher = HttpFetcher::new(&FetchConfig::from(&config))?;
    let gateway = Arc::new(CacheGateway::from_config(&config, Arc::new(store), Arc::new(fetcher))?);

    if let Err(e) = gateway.handle_install().await {
        tracing::error!("install failed: {e}");
    }
    match gateway.handle_activate().await {
        Ok(deleted) => tracing::info!(deleted = ?deleted, "gateway controlling clients"),
        Err(Error::NotInstalled(version)) => {
            tracing::warn!(%version, "no installed generation; serving without control")
        }
        Err(e) => return Err(e.into()),
    }

    let handler = handler::GatewayServer::new(Arc::clone(&gateway));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;
    gateway.wait_until_settled().await?;

    Ok(())
}
