//! Riserva content delivery cache.
//!
//! Two cooperating, independently-lifecycled cache layers for a
//! posts/articles site:
//!
//! - [`client`] — a read-through response cache for list/detail API
//!   reads. TTL-bound, size-bounded, stale-while-revalidate: a fresh hit
//!   is returned immediately and a background refresh is spawned so the
//!   cache self-heals even on hits.
//! - [`worker`] — a version-scoped, request-intercepting asset cache
//!   living in a background agent. Pre-populates critical assets at
//!   install time, serves network-first with cache fallback at runtime,
//!   and degrades to a static offline document when both fail.
//!
//! The two layers never call each other; they share only the freshness
//! goal. Neither guarantees strong consistency — the design optimizes
//! perceived latency and offline resilience.
//!
//! ## Configuration
//!
//! Both layers are configured via `riserva.toml` (see [`config`]):
//!
//! ```toml
//! [response_cache]
//! ttl_ms = 30000
//! max_entries = 50
//!
//! [asset_cache]
//! release = "2026-08-30T12:00:00Z"
//! origin = "https://example.org"
//! manifest = ["/", "/offline.html", "/assets/site.css"]
//! ```

pub mod client;
pub mod config;
pub mod telemetry;
pub mod worker;

pub use client::{CacheEntry, CacheKey, DetailQuery, ListQuery, Lookup, ResourceKind, ResponseCache};
pub use config::Settings;
pub use worker::{AssetWorker, FetchOutcome, StoredResponse, VersionTag, WorkerState};
