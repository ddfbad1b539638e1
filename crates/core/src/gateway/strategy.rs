//! The three caching strategies.
//!
//! Each strategy makes a single network attempt at most; nothing retries.
//! Cache read failures count as misses and cache write failures are logged,
//! so a broken store degrades to plain network behaviour.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::{CacheGateway, Fetcher, GatewayResponse, RequestClass, ResponseSource};
use crate::cache::{CacheHandle, CacheStore};
use crate::{Error, GatewayRequest, StoredResponse};

impl<S: CacheStore, F: Fetcher> CacheGateway<S, F> {
    /// Cache-first: a hit never touches the network. A miss fetches once and
    /// stores a copy of a 200 response before returning it.
    pub(super) async fn cache_first(&self, request: &GatewayRequest) -> Result<GatewayResponse, Error> {
        let cache = self.current_cache();

        if let Some(hit) = self.lookup(&cache, request).await {
            tracing::debug!("cache hit for {}", request.identity());
            return Ok(GatewayResponse {
                response: hit,
                class: Some(RequestClass::StaticAsset),
                source: ResponseSource::Cache,
            });
        }

        let response = self.fetch_network(request).await?;

        match cache.put(request, &response).await {
            Ok(true) => self.stats.record_cache_write(),
            Ok(false) => {}
            Err(e) => tracing::warn!("cache write failed for {}: {e}", request.identity()),
        }

        Ok(GatewayResponse { response, class: Some(RequestClass::StaticAsset), source: ResponseSource::Network })
    }

    /// Network-first: always fetch; a rejected attempt becomes the offline
    /// JSON signal. Responses are never cached.
    pub(super) async fn network_first(&self, request: &GatewayRequest) -> GatewayResponse {
        match self.fetch_network(request).await {
            Ok(response) => {
                GatewayResponse { response, class: Some(RequestClass::ApiCall), source: ResponseSource::Network }
            }
            Err(e) => {
                tracing::warn!("network unavailable for {}: {e}", request.identity());
                self.stats.record_offline_fallback();
                GatewayResponse {
                    response: StoredResponse::offline(),
                    class: Some(RequestClass::ApiCall),
                    source: ResponseSource::OfflineFallback,
                }
            }
        }
    }

    /// Stale-while-revalidate: the network fetch starts as a detached task
    /// before the cache lookup. A hit is returned immediately; the detached
    /// task still refreshes the entry on a 200. A miss waits for the network.
    pub(super) async fn stale_while_revalidate(&self, request: &GatewayRequest) -> Result<GatewayResponse, Error> {
        let cache = self.current_cache();
        let (tx, rx) = oneshot::channel();

        let fetcher = Arc::clone(&self.fetcher);
        let stats = Arc::clone(&self.stats);
        let revalidate = cache.clone();
        let background_request = request.clone();

        self.spawn_background(async move {
            stats.record_network_fetch();
            let result = fetcher.fetch(&background_request).await;
            if result.is_err() {
                stats.record_network_failure();
            }

            let refreshed = match &result {
                Ok(response) if response.is_cacheable() => Some(response.clone()),
                _ => None,
            };

            if tx.send(result).is_err() {
                tracing::debug!("revalidated {} after caller was answered", background_request.identity());
            }

            if let Some(response) = refreshed {
                match revalidate.put(&background_request, &response).await {
                    Ok(true) => stats.record_background_write(),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("revalidation write failed for {}: {e}", background_request.identity()),
                }
            }
        })
        .await;

        if let Some(hit) = self.lookup(&cache, request).await {
            tracing::debug!("serving stale {} while revalidating", request.identity());
            return Ok(GatewayResponse {
                response: hit,
                class: Some(RequestClass::NavigablePage),
                source: ResponseSource::Cache,
            });
        }

        let response = rx
            .await
            .map_err(|_| Error::Task(format!("revalidation of {} dropped", request.identity())))??;

        Ok(GatewayResponse { response, class: Some(RequestClass::NavigablePage), source: ResponseSource::Network })
    }

    /// Cache lookup that records hit/miss and treats store errors as misses.
    async fn lookup(&self, cache: &CacheHandle<S>, request: &GatewayRequest) -> Option<StoredResponse> {
        match cache.lookup(request).await {
            Ok(Some(hit)) => {
                self.stats.record_cache_hit();
                Some(hit)
            }
            Ok(None) => {
                self.stats.record_cache_miss();
                None
            }
            Err(e) => {
                tracing::warn!("cache lookup failed for {}: {e}", request.identity());
                self.stats.record_cache_miss();
                None
            }
        }
    }

    /// One network attempt, counted.
    async fn fetch_network(&self, request: &GatewayRequest) -> Result<StoredResponse, Error> {
        self.stats.record_network_fetch();
        self.fetcher.fetch(request).await.inspect_err(|_| self.stats.record_network_failure())
    }
}
