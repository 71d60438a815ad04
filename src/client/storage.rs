//! Durable storage backends for the response cache.
//!
//! The store itself is policy (TTL, capacity); a [`Storage`] backend is
//! mechanism. Production uses [`JsonFileStorage`]; tests inject
//! [`MemoryStorage`] so no real durable storage is touched.
//!
//! The durable file is shared by every context of the same origin with
//! no locking or transactional discipline. Concurrent writers can race
//! and briefly overshoot the entry bound; the next write self-corrects.
//! That weak consistency is accepted — do not add cross-context locks.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use super::keys::CacheKey;
use super::store::CacheEntry;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to encode cache store: {0}")]
    Encode(String),
    #[error("failed to write cache store at `{path}`: {reason}")]
    Write { path: String, reason: String },
}

/// Client-durable key→entry storage.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn load(&self, key: &CacheKey) -> Option<CacheEntry>;

    async fn save(&self, entry: CacheEntry) -> Result<(), StorageError>;

    async fn remove(&self, key: &CacheKey) -> Result<(), StorageError>;

    /// Every stored entry, for capacity checks and eviction scans.
    async fn entries(&self) -> Vec<CacheEntry>;

    async fn clear(&self) -> Result<(), StorageError>;
}

/// In-memory storage stub for deterministic tests.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    async fn save(&self, entry: CacheEntry) -> Result<(), StorageError> {
        self.entries.write().await.insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn entries(&self) -> Vec<CacheEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Durable storage backed by a single JSON document.
///
/// A missing or corrupt file reads as an empty store (logged, never
/// fatal); the cache repopulates itself on subsequent fetches.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_all(&self) -> Vec<CacheEntry> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "cache store unreadable, starting empty"
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "cache store corrupt, starting empty"
                );
                Vec::new()
            }
        }
    }

    async fn write_all(&self, entries: &[CacheEntry]) -> Result<(), StorageError> {
        let json = serde_json::to_vec(entries).map_err(|err| StorageError::Encode(err.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|err| StorageError::Write {
                path: self.path.display().to_string(),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl Storage for JsonFileStorage {
    async fn load(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.read_all().await.into_iter().find(|e| &e.key == key)
    }

    async fn save(&self, entry: CacheEntry) -> Result<(), StorageError> {
        let mut entries = self.read_all().await;
        entries.retain(|e| e.key != entry.key);
        entries.push(entry);
        self.write_all(&entries).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), StorageError> {
        let mut entries = self.read_all().await;
        let before = entries.len();
        entries.retain(|e| &e.key != key);
        if entries.len() == before {
            return Ok(());
        }
        self.write_all(&entries).await
    }

    async fn entries(&self) -> Vec<CacheEntry> {
        self.read_all().await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StorageError::Write {
                path: self.path.display().to_string(),
                reason: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::client::fetch::{CachedPayload, ListPayload};
    use crate::client::keys::{ListQuery, ResourceKind};

    fn sample_entry(page: u32) -> CacheEntry {
        CacheEntry {
            key: ListQuery::front(ResourceKind::Posts)
                .with_page(page)
                .cache_key(),
            payload: list_payload(page, 10),
            stored_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn list_payload(page: u32, total_pages: u32) -> CachedPayload {
        CachedPayload::List(ListPayload {
            success: true,
            items: vec![],
            current_page: page,
            total_pages,
        })
    }

    fn list_of(entry: &CacheEntry) -> &ListPayload {
        match &entry.payload {
            CachedPayload::List(payload) => payload,
            other => panic!("expected list payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        let entry = sample_entry(1);

        assert!(storage.load(&entry.key).await.is_none());

        storage.save(entry.clone()).await.expect("save");
        let loaded = storage.load(&entry.key).await.expect("stored entry");
        assert_eq!(list_of(&loaded).current_page, 1);

        storage.remove(&entry.key).await.expect("remove");
        assert!(storage.load(&entry.key).await.is_none());
    }

    #[tokio::test]
    async fn file_storage_missing_file_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("cache.json"));
        assert!(storage.entries().await.is_empty());
    }

    #[tokio::test]
    async fn file_storage_corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");
        std::fs::write(&path, b"{not json").expect("write corrupt file");

        let storage = JsonFileStorage::new(&path);
        assert!(storage.entries().await.is_empty());

        // A save replaces the corrupt document outright.
        storage.save(sample_entry(1)).await.expect("save");
        assert_eq!(storage.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cache.json");

        let writer = JsonFileStorage::new(&path);
        writer.save(sample_entry(1)).await.expect("save");
        writer.save(sample_entry(2)).await.expect("save");

        let reader = JsonFileStorage::new(&path);
        assert_eq!(reader.entries().await.len(), 2);

        reader.clear().await.expect("clear");
        assert!(reader.entries().await.is_empty());
    }

    #[tokio::test]
    async fn file_storage_save_overwrites_same_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = JsonFileStorage::new(dir.path().join("cache.json"));

        let mut entry = sample_entry(1);
        storage.save(entry.clone()).await.expect("save");
        entry.payload = list_payload(1, 99);
        storage.save(entry.clone()).await.expect("save");

        let entries = storage.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(list_of(&entries[0]).total_pages, 99);
    }
}
