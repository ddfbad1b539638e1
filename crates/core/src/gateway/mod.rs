//! The offline cache gateway.
//!
//! [`CacheGateway`] owns the caching policy: it pre-warms a versioned cache
//! generation on install, garbage-collects older generations on activate,
//! and answers every intercepted request with the strategy for its class.
//! Storage and network access are injected through [`CacheStore`] and
//! [`Fetcher`], so hosting adapters only wire lifecycle calls to it.
//!
//! ### Lifecycle
//! - `handle_install`: fetch the manifest, write it into the generation
//!   named by the version. All-or-nothing.
//! - `handle_activate`: delete every other generation, then start
//!   controlling clients. Refused unless the current generation exists.
//! - `handle_fetch`: classify and dispatch. Uncontrolled or cross-origin
//!   requests pass through.
//! - `wait_until_settled`: await detached cache writes.

pub mod classify;
pub mod fetcher;
pub mod stats;
mod strategy;


use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use url::{Origin, Url};

pub use classify::{RequestClass, classify};
pub use fetcher::Fetcher;
pub use stats::{GatewayStats, StatsSnapshot};

use crate::cache::{CacheHandle, CacheStore};
use crate::request::resolve;
use crate::{AppConfig, Error, GatewayRequest, StoredResponse};

/// Where a handled response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineFallback,
    Passthrough,
}

/// A response together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub response: StoredResponse,
    /// `None` for requests the gateway did not classify (pass-through).
    pub class: Option<RequestClass>,
    pub source: ResponseSource,
}

/// Outcome of `handle_fetch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The gateway answered the request.
    Handled(GatewayResponse),
    /// The gateway did not intervene; the host should fetch as usual.
    Passthrough,
}

/// Serializable view of the gateway's state.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GatewayStatus {
    pub version: String,
    pub origin: String,
    pub installed: bool,
    pub controlling: bool,
    pub generations: Vec<String>,
    pub cached_entries: usize,
    pub stats: StatsSnapshot,
}

/// Request classifier and caching-policy engine.
pub struct CacheGateway<S: CacheStore, F: Fetcher> {
    store: Arc<S>,
    fetcher: Arc<F>,
    origin_url: Url,
    origin: Origin,
    version: String,
    manifest: Vec<String>,
    installed: AtomicBool,
    controlling: AtomicBool,
    stats: Arc<GatewayStats>,
    background: Mutex<JoinSet<()>>,
}

impl<S: CacheStore, F: Fetcher> CacheGateway<S, F> {
    /// Create a gateway for `origin` serving the generation named `version`.
    pub fn new(store: Arc<S>, fetcher: Arc<F>, origin: Url, version: impl Into<String>, manifest: Vec<String>) -> Self {
        Self {
            store,
            fetcher,
            origin: origin.origin(),
            origin_url: origin,
            version: version.into(),
            manifest,
            installed: AtomicBool::new(false),
            controlling: AtomicBool::new(false),
            stats: Arc::new(GatewayStats::new()),
            background: Mutex::new(JoinSet::new()),
        }
    }

    /// Create a gateway from loaded configuration.
    pub fn from_config(config: &AppConfig, store: Arc<S>, fetcher: Arc<F>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidInput(e.to_string()))?;
        Ok(Self::new(store, fetcher, origin, config.cache_version.clone(), config.manifest.clone()))
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn origin(&self) -> &Url {
        &self.origin_url
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Whether activation has claimed clients.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::Acquire)
    }

    /// Handle bound to the current generation.
    pub fn current_cache(&self) -> CacheHandle<S> {
        CacheHandle::bind(Arc::clone(&self.store), &self.version)
    }

    /// Whether `url` belongs to the gateway's own origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    /// Manifest entries resolved against the origin, as GET requests.
    pub fn manifest_requests(&self) -> Result<Vec<GatewayRequest>, Error> {
        self.manifest
            .iter()
            .map(|entry| {
                resolve(&self.origin_url, entry)
                    .map(|url| GatewayRequest::from_url("GET", url))
                    .map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))
            })
            .collect()
    }

    /// Pre-warm the current generation with every manifest URL.
    ///
    /// All manifest fetches run concurrently. If any is rejected or returns a
    /// non-2xx status the install fails and nothing is written; the
    /// generation itself only comes into existence with its entries.
    ///
    /// Returns the number of cached manifest entries.
    pub async fn handle_install(&self) -> Result<usize, Error> {
        let requests = self.manifest_requests()?;

        tracing::info!(version = %self.version, entries = requests.len(), "installing cache generation");

        let fetched = try_join_all(requests.into_iter().map(|request| async move {
            self.stats.record_network_fetch();
            let response = self.fetcher.fetch(&request).await.map_err(|e| {
                self.stats.record_network_failure();
                Error::InstallFailed { url: request.url.to_string(), reason: e.to_string() }
            })?;
            if !response.is_ok() {
                return Err(Error::InstallFailed {
                    url: request.url.to_string(),
                    reason: format!("status {}", response.status),
                });
            }
            Ok((request, response))
        }))
        .await
        .inspect_err(|e| tracing::warn!(version = %self.version, "install failed: {e}"))?;

        self.current_cache().put_all(&fetched).await?;
        self.installed.store(true, Ordering::Release);

        tracing::info!(version = %self.version, cached = fetched.len(), "cache generation installed");

        Ok(fetched.len())
    }

    /// Delete every generation other than the current one, then claim clients.
    ///
    /// The current generation must already exist in the store, either from
    /// [`handle_install`](Self::handle_install) in this process or from an
    /// earlier run against the same store. Otherwise nothing is deleted and
    /// `Error::NotInstalled` is returned, so the previous generation keeps
    /// serving.
    ///
    /// Returns the names of deleted generations.
    pub async fn handle_activate(&self) -> Result<Vec<String>, Error> {
        let names = self.store.names().await?;
        if !names.contains(&self.version) {
            tracing::warn!(version = %self.version, "refusing to activate a generation that was never installed");
            return Err(Error::NotInstalled(self.version.clone()));
        }

        let stale: Vec<String> = names.into_iter().filter(|name| *name != self.version).collect();

        let mut deleted = Vec::with_capacity(stale.len());
        for name in stale {
            if self.store.delete(&name).await? {
                tracing::info!(generation = %name, "deleted stale cache generation");
                deleted.push(name);
            }
        }

        self.controlling.store(true, Ordering::Release);

        tracing::info!(version = %self.version, deleted = deleted.len(), "gateway activated; clients claimed");

        Ok(deleted)
    }

    /// Classify `request` and answer it with the strategy for its class.
    ///
    /// Returns [`Dispatch::Passthrough`] for cross-origin requests and for
    /// any request seen before activation.
    pub async fn handle_fetch(&self, request: &GatewayRequest) -> Result<Dispatch, Error> {
        if !self.is_controlling() {
            tracing::debug!("not controlling clients yet; passing through {}", request.identity());
            self.stats.record_passthrough();
            return Ok(Dispatch::Passthrough);
        }

        if !self.is_same_origin(&request.url) {
            tracing::debug!("cross-origin request passes through: {}", request.identity());
            self.stats.record_passthrough();
            return Ok(Dispatch::Passthrough);
        }

        let class = classify(&request.url);
        tracing::debug!(class = %class, strategy = class.strategy(), "dispatching {}", request.identity());

        let response = match class {
            RequestClass::StaticAsset => self.cache_first(request).await?,
            RequestClass::ApiCall => self.network_first(request).await,
            RequestClass::NavigablePage => self.stale_while_revalidate(request).await?,
        };

        Ok(Dispatch::Handled(response))
    }

    /// Like [`handle_fetch`](Self::handle_fetch), but performs the plain
    /// network fetch itself when the gateway passes a request through.
    pub async fn respond(&self, request: &GatewayRequest) -> Result<GatewayResponse, Error> {
        match self.handle_fetch(request).await? {
            Dispatch::Handled(response) => Ok(response),
            Dispatch::Passthrough => {
                let response = self.fetcher.fetch(request).await?;
                Ok(GatewayResponse { response, class: None, source: ResponseSource::Passthrough })
            }
        }
    }

    /// Wait for every detached background task spawned so far to finish.
    ///
    /// The task set is swapped out before draining, so requests served
    /// meanwhile can still detach new work.
    ///
    /// # Errors
    ///
    /// Returns `Error::Task` if any task panicked or was cancelled.
    pub async fn wait_until_settled(&self) -> Result<(), Error> {
        let mut tasks = std::mem::take(&mut *self.background.lock().await);
        let mut failure = None;
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                tracing::warn!("background task failed: {e}");
                failure = Some(Error::Task(e.to_string()));
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Snapshot of version, control state, generations and counters.
    pub async fn status(&self) -> Result<GatewayStatus, Error> {
        let generations = self.store.names().await?;
        let cached_entries = self.current_cache().entries().await?.len();
        Ok(GatewayStatus {
            version: self.version.clone(),
            origin: self.origin_url.to_string(),
            installed: self.is_installed(),
            controlling: self.is_controlling(),
            generations,
            cached_entries,
            stats: self.stats.snapshot(),
        })
    }

    /// Detach `task`, reaping any tasks that already finished.
    async fn spawn_background<T>(&self, task: T)
    where
        T: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.background.lock().await;
        while let Some(result) = tasks.try_join_next() {
            if let Err(e) = result {
                tracing::warn!("background task failed: {e}");
            }
        }
        tasks.spawn(task);
    }
}
