//! Cache storage capability.
//!
//! A [`CacheStore`] holds any number of named generations. [`CacheHandle`]
//! binds a store to one generation name, mirroring the `open(name)` handle
//! shape hosting runtimes expose. Binding never creates the generation;
//! the first write does.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::hash::request_key;
use crate::{Error, GatewayRequest, StoredResponse};

/// Metadata for one cached entry, used by inspection tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub key_hash: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub stored_at: DateTime<Utc>,
}

/// Trait for cache generation backends.
///
/// Writes are whole-object upserts keyed by request identity; concurrent
/// writes to the same key resolve last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync + 'static {
    /// Create the generation if absent. Idempotent.
    async fn create(&self, generation: &str) -> Result<(), Error>;

    /// Look up a response stored for `request` in `generation`.
    async fn lookup(&self, generation: &str, request: &GatewayRequest) -> Result<Option<StoredResponse>, Error>;

    /// Store `response` for `request`, replacing any previous entry.
    async fn put(&self, generation: &str, request: &GatewayRequest, response: &StoredResponse) -> Result<(), Error>;

    /// Store a batch of entries atomically: either all land or none do.
    /// The generation is created in the same step, even for an empty batch.
    async fn put_all(&self, generation: &str, entries: &[(GatewayRequest, StoredResponse)]) -> Result<(), Error>;

    /// Names of all existing generations.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and all its entries. Returns false if it did not exist.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// List entry metadata for a generation.
    async fn entries(&self, generation: &str) -> Result<Vec<EntryInfo>, Error>;
}

/// A store bound to one generation.
pub struct CacheHandle<S: ?Sized> {
    store: Arc<S>,
    name: String,
}

impl<S: ?Sized> Clone for CacheHandle<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store), name: self.name.clone() }
    }
}

impl<S: CacheStore + ?Sized> CacheHandle<S> {
    /// Bind to a generation without creating it. Writes create it lazily.
    pub fn bind(store: Arc<S>, name: &str) -> Self {
        Self { store, name: name.to_string() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the stored response for `request`. Non-GET requests never match.
    pub async fn lookup(&self, request: &GatewayRequest) -> Result<Option<StoredResponse>, Error> {
        if !request.is_cacheable_method() {
            return Ok(None);
        }
        self.store.lookup(&self.name, request).await
    }

    /// Store a copy of `response` for `request`.
    ///
    /// Non-GET requests and non-200 responses are skipped; the return value
    /// reports whether anything was written.
    pub async fn put(&self, request: &GatewayRequest, response: &StoredResponse) -> Result<bool, Error> {
        if !request.is_cacheable_method() || !response.is_cacheable() {
            tracing::debug!(
                key = %request_key(request),
                status = response.status,
                "skipping cache write for {}",
                request.identity()
            );
            return Ok(false);
        }
        self.store.put(&self.name, request, response).await?;
        Ok(true)
    }

    pub async fn put_all(&self, entries: &[(GatewayRequest, StoredResponse)]) -> Result<(), Error> {
        self.store.put_all(&self.name, entries).await
    }

    pub async fn entries(&self) -> Result<Vec<EntryInfo>, Error> {
        self.store.entries(&self.name).await
    }
}
