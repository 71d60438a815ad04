//! Request interception strategy.
//!
//! Network-first with cache fallback: an intercepted read request always
//! tries the network; a live response (any status) is opportunistically
//! captured into the current dynamic generation and returned. On network
//! failure the request is looked up across live generations (newest
//! first), then the offline document, and finally a minimal synthesized
//! response — total absence of network, cache and offline document is
//! the only fatal path, surfaced as a degraded response.

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, warn};

use super::generations::{RequestKey, StoredResponse};
use super::lifecycle::{AssetWorker, WorkerState};
use super::version::GenerationRole;

/// How an intercepted request was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the caller forwards the request untouched.
    Passthrough,
    /// Live network response (any status, including non-2xx).
    Network(StoredResponse),
    /// Network failed; answered from a cache generation.
    Cached(StoredResponse),
    /// Network and cache failed; the registered offline document.
    Offline(StoredResponse),
    /// Nothing available; synthesized unavailable response.
    Unavailable(StoredResponse),
}

impl FetchOutcome {
    /// The response to deliver, if the request was intercepted.
    pub fn into_response(self) -> Option<StoredResponse> {
        match self {
            FetchOutcome::Passthrough => None,
            FetchOutcome::Network(response)
            | FetchOutcome::Cached(response)
            | FetchOutcome::Offline(response)
            | FetchOutcome::Unavailable(response) => Some(response),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        matches!(self, FetchOutcome::Passthrough)
    }
}

impl AssetWorker {
    /// Whether the agent intercepts this request at all: the agent must
    /// be active and the request a same-origin HTTP(S) read.
    pub fn intercepts(&self, request: &RequestKey) -> bool {
        if self.state() != WorkerState::Active {
            return false;
        }
        if !request.is_read() {
            return false;
        }
        if !matches!(request.url().scheme(), "http" | "https") {
            return false;
        }
        request.url().origin() == self.origin().origin()
    }

    /// Answer an intercepted request per the network-first strategy.
    pub async fn handle(&self, request: &RequestKey) -> FetchOutcome {
        if !self.intercepts(request) {
            return FetchOutcome::Passthrough;
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                // Best effort: a storage failure must never affect the
                // response delivered to the page.
                let generation = self.version().generation_name(GenerationRole::Dynamic);
                if let Err(err) = self
                    .generations
                    .put(&generation, request.clone(), response.clone())
                    .await
                {
                    warn!(request = %request, error = %err, "opportunistic capture failed");
                }
                FetchOutcome::Network(response)
            }
            Err(err) => {
                debug!(request = %request, error = %err, "network failed, consulting generations");
                if let Some(cached) = self.generations.find(request).await {
                    counter!("riserva_asset_cache_fallback_total").increment(1);
                    return FetchOutcome::Cached(cached);
                }
                self.offline_fallback(request).await
            }
        }
    }

    async fn offline_fallback(&self, request: &RequestKey) -> FetchOutcome {
        counter!("riserva_asset_cache_offline_total").increment(1);

        if let Some(offline) = self.offline_request() {
            if let Some(document) = self.generations.find(&offline).await {
                debug!(request = %request, "serving offline document");
                return FetchOutcome::Offline(document);
            }
        }

        warn!(request = %request, "no network, cache, or offline document");
        FetchOutcome::Unavailable(service_unavailable())
    }
}

fn service_unavailable() -> StoredResponse {
    StoredResponse {
        status: 503,
        headers: vec![(
            "content-type".to_string(),
            "text/html; charset=utf-8".to_string(),
        )],
        body: Bytes::from_static(
            b"<!doctype html><title>Service unavailable</title>\
              <h1>Service unavailable</h1>\
              <p>This page is not available offline.</p>",
        ),
    }
}
