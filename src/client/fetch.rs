//! Posts API seam.
//!
//! The cache consumes one external collaborator: a read-only HTTP(S)
//! JSON endpoint accepting pagination/category/search parameters. The
//! [`PostsApi`] trait abstracts it so tests inject stubs; [`HttpPostsApi`]
//! is the reqwest-backed production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::keys::{DetailQuery, ListQuery};

/// Wire format of a list response.
///
/// Field names follow the external API, not Rust convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPayload {
    pub success: bool,
    pub items: Vec<serde_json::Value>,
    #[serde(rename = "currentPage")]
    pub current_page: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
}

/// Wire format of a detail response: the same success envelope around a
/// single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailPayload {
    pub success: bool,
    pub item: serde_json::Value,
}

/// Body of a cached entry, list or detail. Untagged: the two wire
/// shapes share only the `success` field, so deserialization is
/// unambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CachedPayload {
    List(ListPayload),
    Detail(DetailPayload),
}

/// How a read fetch failed. Classified at the fetch site; callers only
/// ever see one of these, never a raw transport error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network request failed: {0}")]
    Transport(String),
    #[error("unexpected response status {status}")]
    Status { status: u16 },
    #[error("response body could not be decoded: {0}")]
    Decode(String),
    #[error("posts API reported failure")]
    Rejected,
}

#[async_trait]
pub trait PostsApi: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<ListPayload, FetchError>;
    async fn detail(&self, query: &DetailQuery) -> Result<DetailPayload, FetchError>;
}

/// Production posts API client.
pub struct HttpPostsApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpPostsApi {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn with_client(base_url: Url, client: reqwest::Client) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, query: &ListQuery) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::Transport("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(query.resource.as_str());
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &query.page.to_string());
            if let Some(category) = &query.category {
                pairs.append_pair("category", category);
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
        }
        Ok(url)
    }

    fn detail_endpoint(&self, query: &DetailQuery) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::Transport("API base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(query.resource.as_str())
            .push(&query.slug);
        Ok(url)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|err| FetchError::Decode(err.to_string()))
    }
}

#[async_trait]
impl PostsApi for HttpPostsApi {
    async fn list(&self, query: &ListQuery) -> Result<ListPayload, FetchError> {
        let payload: ListPayload = self.fetch_json(self.endpoint(query)?).await?;
        if !payload.success {
            return Err(FetchError::Rejected);
        }
        Ok(payload)
    }

    async fn detail(&self, query: &DetailQuery) -> Result<DetailPayload, FetchError> {
        let payload: DetailPayload = self.fetch_json(self.detail_endpoint(query)?).await?;
        if !payload.success {
            return Err(FetchError::Rejected);
        }
        Ok(payload)
    }
}
