//! Background agent lifecycle.
//!
//! The agent moves through an explicit state machine:
//!
//! ```text
//! Installing -> Installed -> Activating -> Active
//! ```
//!
//! Install populates the critical generation from a fixed manifest,
//! tolerating every individual fetch failure; activation deletes all
//! generations of prior versions and claims open pages without a reload.
//! The hosting environment serializes install/activate across agent
//! instances, so the deletion step needs no extra synchronization.

use std::sync::{Arc, RwLock};

use metrics::counter;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{AssetCacheSettings, SettingsError};

use super::generations::{GenerationStore, RequestKey};
use super::lock::{rw_read, rw_write};
use super::net::Network;
use super::version::{GenerationRole, VersionTag};

const SOURCE: &str = "worker::lifecycle";

/// Lifecycle state of the background agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Active,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        }
    }
}

/// Outcome of an install pass. Failures are informational; install
/// completes regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallReport {
    pub attempted: usize,
    pub failed: usize,
}

/// The intercepting asset/fallback cache agent. One logical instance per
/// origin, shared by all open pages, outliving any single page.
pub struct AssetWorker {
    version: VersionTag,
    origin: Url,
    offline_path: String,
    manifest: Vec<String>,
    pub(super) generations: Arc<dyn GenerationStore>,
    pub(super) network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
}

impl AssetWorker {
    pub fn new(
        settings: &AssetCacheSettings,
        generations: Arc<dyn GenerationStore>,
        network: Arc<dyn Network>,
    ) -> Result<Self, SettingsError> {
        let origin = settings.origin_url()?;
        Ok(Self {
            version: VersionTag::from_release(&settings.release),
            origin,
            offline_path: settings.offline_path.clone(),
            manifest: settings.manifest.clone(),
            generations,
            network,
            state: RwLock::new(WorkerState::Installing),
        })
    }

    pub fn state(&self) -> WorkerState {
        *rw_read(&self.state, SOURCE, "state")
    }

    pub fn version(&self) -> &VersionTag {
        &self.version
    }

    pub(super) fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve a site-relative path against the configured origin.
    pub fn asset_url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.origin.join(path)
    }

    pub(super) fn offline_request(&self) -> Option<RequestKey> {
        self.asset_url(&self.offline_path).ok().map(RequestKey::get)
    }

    /// Populate the critical generation from the manifest (plus the
    /// offline document). Each individual failure is caught, logged and
    /// counted; a missing asset never aborts the install. Readiness is
    /// signaled immediately on completion — the agent does not wait for
    /// a previous version's instance to relinquish control.
    pub async fn install(&self) -> InstallReport {
        let generation = self.version.generation_name(GenerationRole::Critical);
        self.generations.ensure(&generation).await;

        let mut paths: Vec<&str> = self.manifest.iter().map(String::as_str).collect();
        if !paths.contains(&self.offline_path.as_str()) {
            paths.push(&self.offline_path);
        }

        let mut report = InstallReport {
            attempted: paths.len(),
            failed: 0,
        };

        for path in paths {
            if let Err(err) = self.install_asset(&generation, path).await {
                counter!("riserva_install_asset_failure_total").increment(1);
                warn!(path, error = %err, "skipping manifest asset");
                report.failed += 1;
            }
        }

        self.transition(WorkerState::Installed);
        info!(
            version = %self.version,
            attempted = report.attempted,
            failed = report.failed,
            "install complete"
        );
        report
    }

    async fn install_asset(&self, generation: &str, path: &str) -> Result<(), String> {
        let url = self.asset_url(path).map_err(|err| err.to_string())?;
        let key = RequestKey::get(url);
        let response = self
            .network
            .fetch(&key)
            .await
            .map_err(|err| err.to_string())?;
        self.generations
            .put(generation, key, response)
            .await
            .map_err(|err| err.to_string())
    }

    /// Delete every generation from a prior version, then claim control
    /// of all open pages. After this returns, only current-version
    /// generation names are live.
    pub async fn activate(&self) {
        self.transition(WorkerState::Activating);

        for name in self.generations.names().await {
            if !self.version.owns(&name) {
                let deleted = self.generations.delete(&name).await;
                debug!(generation = %name, deleted, "dropped stale generation");
            }
        }

        self.transition(WorkerState::Active);
        info!(version = %self.version, "activation complete, pages claimed");
    }

    /// Control command: activate immediately instead of waiting for the
    /// previous version's agent to finish.
    pub async fn skip_waiting(&self) {
        info!(version = %self.version, "skip-waiting requested");
        self.activate().await;
    }

    /// Control command: administrative cache reset. Deletes every
    /// generation, current version included.
    pub async fn purge_all(&self) {
        let names = self.generations.names().await;
        for name in &names {
            self.generations.delete(name).await;
        }
        info!(purged = names.len(), "all cache generations purged");
    }

    fn transition(&self, next: WorkerState) {
        let mut state = rw_write(&self.state, SOURCE, "transition");
        debug!(from = state.as_str(), to = next.as_str(), "state transition");
        *state = next;
    }
}
