//! Network seam for the intercepting cache.

use async_trait::async_trait;
use thiserror::Error;

use super::generations::{RequestKey, StoredResponse};

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("network request failed: {0}")]
    Transport(String),
    #[error("request could not be issued: {0}")]
    Invalid(String),
}

/// Issues real network requests. A response with any status is a
/// success at this seam; only transport-level failure is an error.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &RequestKey) -> Result<StoredResponse, NetworkError>;
}

/// Production network client.
#[derive(Default)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &RequestKey) -> Result<StoredResponse, NetworkError> {
        let method = reqwest::Method::from_bytes(request.method().as_bytes())
            .map_err(|err| NetworkError::Invalid(err.to_string()))?;

        let response = self
            .client
            .request(method, request.url().clone())
            .send()
            .await
            .map_err(|err| NetworkError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| NetworkError::Transport(err.to_string()))?;

        Ok(StoredResponse {
            status,
            headers,
            body,
        })
    }
}
