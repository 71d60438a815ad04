//! Bounded, TTL-aware entry store.
//!
//! Policy layer over a [`Storage`] backend: freshness is decided at read
//! time against the configured TTL, capacity is enforced at write time
//! by evicting the entry with the oldest `stored_at`. Reads never
//! refresh recency, so this is write-recency eviction, not true LRU.

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::config::ResponseCacheSettings;

use super::fetch::CachedPayload;
use super::keys::CacheKey;
use super::storage::{Storage, StorageError};

/// A cached read response. Created on a successful fetch, read-only on
/// hit, destroyed by TTL expiry or capacity eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub payload: CachedPayload,
    pub stored_at: OffsetDateTime,
}

/// A lookup result: the entry plus whether it is still within TTL.
#[derive(Debug, Clone)]
pub struct CachedLookup {
    pub entry: CacheEntry,
    pub fresh: bool,
}

pub struct EntryStore {
    storage: Arc<dyn Storage>,
    capacity: usize,
    ttl: Duration,
}

impl EntryStore {
    pub fn new(storage: Arc<dyn Storage>, settings: &ResponseCacheSettings) -> Self {
        Self {
            storage,
            capacity: settings.max_entries_non_zero().get(),
            ttl: Duration::milliseconds(settings.ttl_ms as i64),
        }
    }

    /// Look up an entry and classify its freshness against `now`.
    pub async fn lookup(&self, key: &CacheKey, now: OffsetDateTime) -> Option<CachedLookup> {
        let entry = self.storage.load(key).await?;
        let fresh = now - entry.stored_at < self.ttl;
        Some(CachedLookup { entry, fresh })
    }

    /// Insert an entry, evicting oldest-stored entries while the store
    /// is at capacity.
    ///
    /// The read-then-write sequence is not atomic across contexts; a
    /// bounded overshoot under concurrent writers is corrected here on
    /// the next write by looping until under capacity.
    pub async fn insert(&self, entry: CacheEntry) -> Result<(), StorageError> {
        let mut existing = self.storage.entries().await;

        if !existing.iter().any(|e| e.key == entry.key) {
            while existing.len() >= self.capacity {
                let Some(oldest) = existing
                    .iter()
                    .min_by_key(|e| e.stored_at)
                    .map(|e| e.key.clone())
                else {
                    break;
                };
                debug!(key = %oldest, "evicting oldest cache entry at capacity");
                self.storage.remove(&oldest).await?;
                existing.retain(|e| e.key != oldest);
                counter!("riserva_response_cache_evict_total").increment(1);
            }
        }

        self.storage.save(entry).await
    }

    pub async fn len(&self) -> usize {
        self.storage.entries().await.len()
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.storage.clear().await
    }
}
