//! Read-through response cache.
//!
//! The caller-facing surface of the client layer, for list and detail
//! reads alike. A fresh hit is served synchronously and still spawns a
//! background refresh, so the cache self-heals even on hits; a miss or
//! expired entry is refetched in the foreground. Background refresh
//! failures go to an explicit error sink and never reach the caller.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use crate::config::ResponseCacheSettings;

use super::clock::{Clock, SystemClock};
use super::fetch::{CachedPayload, DetailPayload, FetchError, ListPayload, PostsApi};
use super::keys::{CacheKey, DetailQuery, ListQuery};
use super::storage::{JsonFileStorage, MemoryStorage, Storage, StorageError};
use super::store::{CacheEntry, CachedLookup, EntryStore};

/// A successful read: the payload plus whether it was served past its
/// TTL because the network could not produce a fresher one.
#[derive(Debug, Clone)]
pub struct Lookup<P> {
    pub payload: P,
    pub stale: bool,
}

/// A read request of either shape, with one key space and one fetch
/// path so list and detail reads share the full read-through flow.
#[derive(Clone)]
enum ReadQuery {
    List(ListQuery),
    Detail(DetailQuery),
}

impl ReadQuery {
    fn cache_key(&self) -> CacheKey {
        match self {
            ReadQuery::List(query) => query.cache_key(),
            ReadQuery::Detail(query) => query.cache_key(),
        }
    }

    async fn fetch(&self, api: &dyn PostsApi) -> Result<CachedPayload, FetchError> {
        match self {
            ReadQuery::List(query) => api.list(query).await.map(CachedPayload::List),
            ReadQuery::Detail(query) => api.detail(query).await.map(CachedPayload::Detail),
        }
    }
}

/// Receives background refresh failures. The default sink logs them;
/// tests inject a recording sink to observe the silent-failure contract.
pub type RefreshErrorSink = Arc<dyn Fn(&CacheKey, &FetchError) + Send + Sync>;

struct CacheInner {
    store: EntryStore,
    api: Arc<dyn PostsApi>,
    clock: Arc<dyn Clock>,
    refresh_error_sink: RefreshErrorSink,
}

pub struct ResponseCache {
    inner: Arc<CacheInner>,
}

impl ResponseCache {
    /// Build a cache whose storage backend follows the settings: a JSON
    /// file when `storage_path` is set, in-memory otherwise.
    pub fn from_settings(settings: &ResponseCacheSettings, api: Arc<dyn PostsApi>) -> Self {
        let storage: Arc<dyn Storage> = match &settings.storage_path {
            Some(path) => Arc::new(JsonFileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        };
        Self::new(settings, storage, api)
    }

    pub fn new(
        settings: &ResponseCacheSettings,
        storage: Arc<dyn Storage>,
        api: Arc<dyn PostsApi>,
    ) -> Self {
        Self::with_parts(
            settings,
            storage,
            api,
            Arc::new(SystemClock),
            default_refresh_error_sink(),
        )
    }

    /// Fully injected constructor for deterministic tests.
    pub fn with_parts(
        settings: &ResponseCacheSettings,
        storage: Arc<dyn Storage>,
        api: Arc<dyn PostsApi>,
        clock: Arc<dyn Clock>,
        refresh_error_sink: RefreshErrorSink,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store: EntryStore::new(storage, settings),
                api,
                clock,
                refresh_error_sink,
            }),
        }
    }

    /// Read-through lookup for a list query.
    pub async fn get(&self, query: &ListQuery) -> Result<Lookup<ListPayload>, FetchError> {
        let lookup = self.read(ReadQuery::List(query.clone())).await?;
        match lookup.payload {
            CachedPayload::List(payload) => Ok(Lookup {
                payload,
                stale: lookup.stale,
            }),
            // Unreachable while list and detail key spaces stay disjoint.
            CachedPayload::Detail(_) => Err(FetchError::Decode(
                "cached entry is not a list payload".to_string(),
            )),
        }
    }

    /// Read-through lookup for a detail query.
    pub async fn get_detail(
        &self,
        query: &DetailQuery,
    ) -> Result<Lookup<DetailPayload>, FetchError> {
        let lookup = self.read(ReadQuery::Detail(query.clone())).await?;
        match lookup.payload {
            CachedPayload::Detail(payload) => Ok(Lookup {
                payload,
                stale: lookup.stale,
            }),
            CachedPayload::List(_) => Err(FetchError::Decode(
                "cached entry is not a detail payload".to_string(),
            )),
        }
    }

    /// The shared read-through flow.
    ///
    /// - fresh hit: cached payload, plus a fire-and-forget refresh;
    /// - miss or expired: foreground fetch, stored on success;
    /// - foreground failure with an expired entry still on hand: that
    ///   payload, flagged `stale`;
    /// - foreground failure with nothing cached: the error.
    async fn read(&self, query: ReadQuery) -> Result<Lookup<CachedPayload>, FetchError> {
        let key = query.cache_key();
        let now = self.inner.clock.now();

        let expired = match self.inner.store.lookup(&key, now).await {
            Some(CachedLookup { entry, fresh: true }) => {
                counter!("riserva_response_cache_hit_total").increment(1);
                debug!(key = %key, outcome = "hit", "serving fresh cached payload");
                self.spawn_refresh(query.clone(), key);
                return Ok(Lookup {
                    payload: entry.payload,
                    stale: false,
                });
            }
            Some(CachedLookup { entry, fresh: false }) => Some(entry),
            None => None,
        };

        counter!("riserva_response_cache_miss_total").increment(1);
        debug!(key = %key, outcome = "miss", "fetching in the foreground");

        match query.fetch(self.inner.api.as_ref()).await {
            Ok(payload) => {
                self.inner.store_payload(&key, payload.clone()).await;
                Ok(Lookup {
                    payload,
                    stale: false,
                })
            }
            Err(err) => match expired {
                Some(entry) => {
                    counter!("riserva_response_cache_stale_serve_total").increment(1);
                    warn!(key = %key, error = %err, "refetch failed, serving expired payload");
                    Ok(Lookup {
                        payload: entry.payload,
                        stale: true,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Administrative reset: drop every cached entry.
    pub async fn purge(&self) -> Result<(), StorageError> {
        self.inner.store.clear().await
    }

    pub async fn len(&self) -> usize {
        self.inner.store.len().await
    }

    fn spawn_refresh(&self, query: ReadQuery, key: CacheKey) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            match query.fetch(inner.api.as_ref()).await {
                Ok(payload) => {
                    debug!(key = %key, "background refresh stored a fresher payload");
                    inner.store_payload(&key, payload).await;
                }
                Err(err) => {
                    counter!("riserva_refresh_failure_total").increment(1);
                    (inner.refresh_error_sink)(&key, &err);
                }
            }
        });
    }
}

impl CacheInner {
    /// Store a fetched payload; storage failures are logged, never
    /// surfaced — the payload has already been (or will be) delivered.
    async fn store_payload(&self, key: &CacheKey, payload: CachedPayload) {
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            stored_at: self.clock.now(),
        };
        if let Err(err) = self.store.insert(entry).await {
            warn!(key = %key, error = %err, "failed to store fetched payload");
        }
    }
}

fn default_refresh_error_sink() -> RefreshErrorSink {
    Arc::new(|key, err| {
        warn!(key = %key, error = %err, "background refresh failed");
    })
}
