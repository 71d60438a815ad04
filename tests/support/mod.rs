//! Shared test doubles for the integration suites.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use riserva::client::{
    DetailPayload, DetailQuery, FetchError, ListPayload, ListQuery, PostsApi, RefreshErrorSink,
};
use riserva::worker::{
    GenerationError, GenerationStore, MemoryGenerations, Network, NetworkError, RequestKey,
    StoredResponse,
};

/// A list payload distinguishable by its `total_pages` marker.
pub fn payload(marker: u32) -> ListPayload {
    ListPayload {
        success: true,
        items: vec![serde_json::json!({ "marker": marker })],
        current_page: 1,
        total_pages: marker,
    }
}

/// A detail payload distinguishable by its `rev` marker.
pub fn detail_payload(slug: &str, rev: u32) -> DetailPayload {
    DetailPayload {
        success: true,
        item: serde_json::json!({ "slug": slug, "rev": rev }),
    }
}

/// Posts API double: scripted per-query payloads, an offline switch and
/// a per-query call count.
pub struct ScriptedApi {
    payloads: Mutex<HashMap<String, ListPayload>>,
    details: Mutex<HashMap<String, DetailPayload>>,
    online: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl Default for ScriptedApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            payloads: Mutex::new(HashMap::new()),
            details: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn serve(&self, query: &ListQuery, response: ListPayload) {
        self.payloads
            .lock()
            .expect("payloads")
            .insert(query.cache_key().as_str().to_string(), response);
    }

    pub fn serve_detail(&self, query: &DetailQuery, response: DetailPayload) {
        self.details
            .lock()
            .expect("details")
            .insert(query.cache_key().as_str().to_string(), response);
    }

    pub fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.online.store(true, Ordering::SeqCst);
    }

    pub fn calls_for(&self, query: &ListQuery) -> usize {
        self.calls_for_key(query.cache_key().as_str())
    }

    pub fn detail_calls_for(&self, query: &DetailQuery) -> usize {
        self.calls_for_key(query.cache_key().as_str())
    }

    fn calls_for_key(&self, key: &str) -> usize {
        self.calls
            .lock()
            .expect("calls")
            .iter()
            .filter(|k| *k == key)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls").len()
    }
}

#[async_trait]
impl PostsApi for ScriptedApi {
    async fn list(&self, query: &ListQuery) -> Result<ListPayload, FetchError> {
        let key = query.cache_key().as_str().to_string();
        self.calls.lock().expect("calls").push(key.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("scripted network down".to_string()));
        }
        self.payloads
            .lock()
            .expect("payloads")
            .get(&key)
            .cloned()
            .ok_or(FetchError::Status { status: 404 })
    }

    async fn detail(&self, query: &DetailQuery) -> Result<DetailPayload, FetchError> {
        let key = query.cache_key().as_str().to_string();
        self.calls.lock().expect("calls").push(key.clone());

        if !self.online.load(Ordering::SeqCst) {
            return Err(FetchError::Transport("scripted network down".to_string()));
        }
        self.details
            .lock()
            .expect("details")
            .get(&key)
            .cloned()
            .ok_or(FetchError::Status { status: 404 })
    }
}

/// Error sink that records background refresh failures for assertions.
pub fn recording_sink() -> (RefreshErrorSink, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: RefreshErrorSink = Arc::new(move |key, err| {
        sink_seen
            .lock()
            .expect("sink")
            .push(format!("{key}: {err}"));
    });
    (sink, seen)
}

/// Network double for the worker: path-routed responses plus an offline
/// switch. Unknown paths fail like an unreachable host.
pub struct RouteNetwork {
    routes: Mutex<HashMap<String, StoredResponse>>,
    online: AtomicBool,
}

impl Default for RouteNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteNetwork {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    pub fn route(&self, path: &str, body: &str) {
        self.route_with_status(path, 200, body);
    }

    pub fn route_with_status(&self, path: &str, status: u16, body: &str) {
        self.routes.lock().expect("routes").insert(
            path.to_string(),
            StoredResponse {
                status,
                headers: vec![("content-type".to_string(), "text/html".to_string())],
                body: Bytes::from(body.to_string()),
            },
        );
    }

    pub fn unroute(&self, path: &str) {
        self.routes.lock().expect("routes").remove(path);
    }

    pub fn go_offline(&self) {
        self.online.store(false, Ordering::SeqCst);
    }

    pub fn go_online(&self) {
        self.online.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Network for RouteNetwork {
    async fn fetch(&self, request: &RequestKey) -> Result<StoredResponse, NetworkError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(NetworkError::Transport("network down".to_string()));
        }
        self.routes
            .lock()
            .expect("routes")
            .get(request.url().path())
            .cloned()
            .ok_or_else(|| NetworkError::Transport("no route to host".to_string()))
    }
}

/// Generation store whose writes always fail; reads and deletes delegate
/// to an in-memory store.
pub struct FailingGenerations {
    inner: MemoryGenerations,
}

impl Default for FailingGenerations {
    fn default() -> Self {
        Self::new()
    }
}

impl FailingGenerations {
    pub fn new() -> Self {
        Self {
            inner: MemoryGenerations::new(),
        }
    }
}

#[async_trait]
impl GenerationStore for FailingGenerations {
    async fn ensure(&self, generation: &str) {
        self.inner.ensure(generation).await;
    }

    async fn put(
        &self,
        generation: &str,
        _key: RequestKey,
        _response: StoredResponse,
    ) -> Result<(), GenerationError> {
        Err(GenerationError::Store {
            generation: generation.to_string(),
            reason: "quota exceeded".to_string(),
        })
    }

    async fn get(&self, generation: &str, key: &RequestKey) -> Option<StoredResponse> {
        self.inner.get(generation, key).await
    }

    async fn find(&self, key: &RequestKey) -> Option<StoredResponse> {
        self.inner.find(key).await
    }

    async fn delete(&self, generation: &str) -> bool {
        self.inner.delete(generation).await
    }

    async fn names(&self) -> Vec<String> {
        self.inner.names().await
    }
}
