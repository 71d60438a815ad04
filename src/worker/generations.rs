//! Named, version-scoped cache generations.
//!
//! A generation is a container of captured responses keyed by request
//! identity (method + URL). Generations are created whole at install
//! time or filled opportunistically at runtime, and destroyed whole when
//! their version goes stale. The [`GenerationStore`] trait abstracts the
//! backing so tests inject in-memory (or deliberately failing) stores.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

/// Request identity: normalized method plus full URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: Url,
}

impl RequestKey {
    pub fn new(method: &str, url: Url) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Read requests are interceptable; anything else passes through.
    pub fn is_read(&self) -> bool {
        matches!(self.method.as_str(), "GET" | "HEAD")
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An opaque captured network response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl StoredResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to store response in generation `{generation}`: {reason}")]
    Store { generation: String, reason: String },
}

/// Backing store for cache generations.
///
/// `find` searches every live generation, most recently created first —
/// after a deploy the fresher generation wins when both hold an asset.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Create the named generation if it does not exist yet.
    async fn ensure(&self, generation: &str);

    async fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> Result<(), GenerationError>;

    async fn get(&self, generation: &str, key: &RequestKey) -> Option<StoredResponse>;

    /// Look the request up across all generations, newest first.
    async fn find(&self, key: &RequestKey) -> Option<StoredResponse>;

    /// Delete a whole generation; returns whether it existed.
    async fn delete(&self, generation: &str) -> bool;

    /// Live generation names in creation order.
    async fn names(&self) -> Vec<String>;
}

/// In-memory generation store. Creation order is preserved so
/// newest-first lookup is well-defined.
#[derive(Default)]
pub struct MemoryGenerations {
    generations: RwLock<Vec<Generation>>,
}

struct Generation {
    name: String,
    entries: HashMap<RequestKey, StoredResponse>,
}

impl MemoryGenerations {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GenerationStore for MemoryGenerations {
    async fn ensure(&self, generation: &str) {
        let mut generations = self.generations.write().await;
        if !generations.iter().any(|g| g.name == generation) {
            generations.push(Generation {
                name: generation.to_string(),
                entries: HashMap::new(),
            });
        }
    }

    async fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: StoredResponse,
    ) -> Result<(), GenerationError> {
        let mut generations = self.generations.write().await;
        let index = match generations.iter().position(|g| g.name == generation) {
            Some(index) => index,
            None => {
                generations.push(Generation {
                    name: generation.to_string(),
                    entries: HashMap::new(),
                });
                generations.len() - 1
            }
        };
        generations[index].entries.insert(key, response);
        Ok(())
    }

    async fn get(&self, generation: &str, key: &RequestKey) -> Option<StoredResponse> {
        self.generations
            .read()
            .await
            .iter()
            .find(|g| g.name == generation)
            .and_then(|g| g.entries.get(key).cloned())
    }

    async fn find(&self, key: &RequestKey) -> Option<StoredResponse> {
        self.generations
            .read()
            .await
            .iter()
            .rev()
            .find_map(|g| g.entries.get(key).cloned())
    }

    async fn delete(&self, generation: &str) -> bool {
        let mut generations = self.generations.write().await;
        let before = generations.len();
        generations.retain(|g| g.name != generation);
        generations.len() != before
    }

    async fn names(&self) -> Vec<String> {
        self.generations
            .read()
            .await
            .iter()
            .map(|g| g.name.clone())
            .collect()
    }
}
