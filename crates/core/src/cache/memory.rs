//! In-memory cache store.
//!
//! Uses nested maps behind a tokio RwLock. Suitable for tests and for
//! hosting adapters that do not need persistence across restarts.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::hash::request_key;
use super::store::{CacheStore, EntryInfo};
use crate::{Error, GatewayRequest, StoredResponse};

#[derive(Debug, Clone)]
struct MemoryEntry {
    method: String,
    url: String,
    response: StoredResponse,
    stored_at: DateTime<Utc>,
}

/// Cache store held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    generations: RwLock<BTreeMap<String, HashMap<String, MemoryEntry>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_for(request: &GatewayRequest, response: &StoredResponse) -> MemoryEntry {
        MemoryEntry {
            method: request.method.clone(),
            url: request.url.to_string(),
            response: response.clone(),
            stored_at: Utc::now(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn create(&self, generation: &str) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        generations.entry(generation.to_string()).or_default();
        Ok(())
    }

    async fn lookup(&self, generation: &str, request: &GatewayRequest) -> Result<Option<StoredResponse>, Error> {
        let generations = self.generations.read().await;
        let found = generations
            .get(generation)
            .and_then(|entries| entries.get(&request_key(request)))
            .map(|entry| entry.response.clone());
        Ok(found)
    }

    async fn put(&self, generation: &str, request: &GatewayRequest, response: &StoredResponse) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        generations
            .entry(generation.to_string())
            .or_default()
            .insert(request_key(request), Self::entry_for(request, response));
        Ok(())
    }

    async fn put_all(&self, generation: &str, entries: &[(GatewayRequest, StoredResponse)]) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        let target = generations.entry(generation.to_string()).or_default();
        for (request, response) in entries {
            target.insert(request_key(request), Self::entry_for(request, response));
        }
        Ok(())
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }

    async fn entries(&self, generation: &str) -> Result<Vec<EntryInfo>, Error> {
        let generations = self.generations.read().await;
        let mut infos: Vec<EntryInfo> = generations
            .get(generation)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(key_hash, entry)| EntryInfo {
                        key_hash: key_hash.clone(),
                        method: entry.method.clone(),
                        url: entry.url.clone(),
                        status: entry.response.status,
                        stored_at: entry.stored_at,
                    })
                    .collect()
            })
            .unwrap_or_default();
        infos.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(infos)
    }
}
