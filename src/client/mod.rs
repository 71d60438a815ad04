//! Read-through response cache.
//!
//! Client-resident cache for list/detail API reads. Returns cached data
//! immediately when it is within TTL (spawning a background refresh so
//! the cache self-heals even on hits), refetches in the foreground when
//! absent or expired, and bounds the store by evicting the entry with
//! the oldest `stored_at`.
//!
//! Everything with a side effect is behind a seam — storage backend,
//! posts API, clock, refresh error sink — so behavior is deterministic
//! under test with in-memory stubs.
//!
//! Concurrent `get`s for the same key are deliberately not deduplicated:
//! reads are idempotent, so duplicated in-flight fetches cost bandwidth,
//! not correctness.

mod cache;
mod clock;
mod fetch;
mod keys;
mod storage;
mod store;

pub use cache::{Lookup, RefreshErrorSink, ResponseCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fetch::{CachedPayload, DetailPayload, FetchError, HttpPostsApi, ListPayload, PostsApi};
pub use keys::{CacheKey, DetailQuery, ListQuery, ResourceKind};
pub use storage::{JsonFileStorage, MemoryStorage, Storage, StorageError};
pub use store::{CacheEntry, CachedLookup, EntryStore};
