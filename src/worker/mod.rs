//! Intercepting asset/fallback cache.
//!
//! A background agent, installed once per site version, that owns named
//! cache generations scoped to a version tag:
//!
//! - **install**: pre-populate the critical generation from a manifest,
//!   tolerating individual fetch failures;
//! - **activate**: delete every prior-version generation, claim pages;
//! - **active**: answer intercepted same-origin reads network-first,
//!   falling back to cached generations, the offline document, and
//!   finally a synthesized unavailable response.
//!
//! Control commands from the page: [`AssetWorker::skip_waiting`] and
//! [`AssetWorker::purge_all`].

mod generations;
mod lifecycle;
mod lock;
mod net;
mod strategy;
mod version;

pub use generations::{
    GenerationError, GenerationStore, MemoryGenerations, RequestKey, StoredResponse,
};
pub use lifecycle::{AssetWorker, InstallReport, WorkerState};
pub use net::{HttpNetwork, Network, NetworkError};
pub use strategy::FetchOutcome;
pub use version::{GenerationRole, VersionTag};
