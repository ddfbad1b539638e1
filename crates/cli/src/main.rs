//! offline-gateway command line.
//!
//! Drives the gateway lifecycle against the SQLite cache from a shell:
//! pre-warm a generation, activate it, route single requests, and inspect
//! what is stored. Logs go to stderr; command output is JSON on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use offline_gateway_client::{FetchConfig, HttpFetcher};
use offline_gateway_core::{
    AppConfig, CacheGateway, CacheHandle, CacheStore, Error, GatewayRequest, SqliteCacheStore, request::resolve,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

type Gateway = CacheGateway<SqliteCacheStore, HttpFetcher>;

#[derive(Parser, Debug)]
#[command(name = "offline-gateway")]
#[command(about = "Offline cache gateway for Super-Tool")]
#[command(version)]
struct Args {
    /// TOML config file (default: $OFFLINE_GATEWAY_CONFIG_FILE)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the manifest into the current cache generation
    Install,
    /// Delete every generation other than the current one
    Activate,
    /// Route one request through an activated gateway
    Fetch {
        /// Absolute URL or a path on the configured origin
        url: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Print the response body instead of a summary
        #[arg(long)]
        body: bool,
    },
    /// List cache generations and their entry counts
    Generations,
    /// Show version, control state and counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(Some(path)),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    let gateway = open_gateway(&config).await?;

    match args.command {
        Command::Install => {
            let cached = gateway.handle_install().await?;
            print_json(&json!({ "version": gateway.version(), "cached": cached }))?;
        }
        Command::Activate => {
            let deleted = gateway.handle_activate().await?;
            print_json(&json!({ "version": gateway.version(), "deleted": deleted }))?;
        }
        Command::Fetch { url, method, body } => {
            match gateway.handle_activate().await {
                Ok(deleted) if !deleted.is_empty() => tracing::info!(deleted = ?deleted, "deleted stale generations"),
                Ok(_) => {}
                Err(Error::NotInstalled(version)) => {
                    tracing::warn!(%version, "generation not installed; request passes through uncached")
                }
                Err(e) => return Err(e.into()),
            }

            let url = resolve(gateway.origin(), &url).with_context(|| format!("invalid url {url}"))?;
            let request = GatewayRequest::from_url(&method, url);
            let handled = gateway.respond(&request).await?;
            gateway.wait_until_settled().await?;

            if body {
                print!("{}", String::from_utf8_lossy(&handled.response.body));
            } else {
                print_json(&json!({
                    "url": request.url.as_str(),
                    "method": request.method,
                    "status": handled.response.status,
                    "class": handled.class,
                    "source": handled.source,
                    "content_type": handled.response.header("content-type"),
                    "body_bytes": handled.response.body.len(),
                }))?;
            }
        }
        Command::Generations => {
            let store = gateway.store();
            let mut generations = Vec::new();
            for name in store.names().await? {
                let entries = CacheHandle::bind(Arc::clone(store), &name).entries().await?;
                generations.push(json!({
                    "name": name,
                    "current": name == gateway.version(),
                    "entries": entries.len(),
                }));
            }
            print_json(&generations)?;
        }
        Command::Status => print_json(&gateway.status().await?)?,
    }

    Ok(())
}

async fn open_gateway(config: &AppConfig) -> Result<Gateway> {
    let db_path = config.require_db_path().context("invalid configuration")?;
    let store = SqliteCacheStore::open(db_path)
        .await
        .with_context(|| format!("failed to open cache database at {}", db_path.display()))?;
    let fetcher = HttpFetcher::new(&FetchConfig::from(config))?;
    Ok(CacheGateway::from_config(config, Arc::new(store), Arc::new(fetcher))?)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
