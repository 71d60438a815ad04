//! Cache key derivation for read requests.
//!
//! A [`CacheKey`] is a deterministic string built from the semantic
//! parameters of a read: a [`ListQuery`] for paginated collections, a
//! [`DetailQuery`] for a single document. Identical parameters always
//! produce the same key; any differing parameter produces a distinct
//! key, and list and detail keys can never collide. Keys are persisted
//! with their entries, so the encoding must stay stable across
//! processes — no in-process hashers.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Which read-only resource a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Posts,
    Pages,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Posts => "posts",
            ResourceKind::Pages => "pages",
        }
    }
}

/// Semantic parameters of a list read: resource kind, page number and
/// optional filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub resource: ResourceKind,
    pub page: u32,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl ListQuery {
    /// First page of a resource with no filters.
    pub fn front(resource: ResourceKind) -> Self {
        Self {
            resource,
            page: 1,
            category: None,
            search: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Derive the deterministic cache key for this query.
    ///
    /// Filter values are form-encoded so user input (spaces, separators,
    /// unicode) can never collide with the key structure.
    pub fn cache_key(&self) -> CacheKey {
        let mut encoded = form_urlencoded::Serializer::new(String::new());
        encoded.append_pair("page", &self.page.to_string());
        if let Some(category) = &self.category {
            encoded.append_pair("category", category);
        }
        if let Some(search) = &self.search {
            encoded.append_pair("search", search);
        }
        CacheKey(format!("{}?{}", self.resource.as_str(), encoded.finish()))
    }
}

/// Semantic parameters of a detail read: one document, addressed by its
/// slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailQuery {
    pub resource: ResourceKind,
    pub slug: String,
}

impl DetailQuery {
    pub fn new(resource: ResourceKind, slug: impl Into<String>) -> Self {
        Self {
            resource,
            slug: slug.into(),
        }
    }

    /// Derive the deterministic cache key for this query.
    ///
    /// Detail keys use a `/` separator and list keys a `?`, so the two
    /// key spaces are disjoint regardless of slug content.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!("{}/{}", self.resource.as_str(), self.slug))
    }
}

/// Deterministic identity of a cached read response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_queries_share_a_key() {
        let a = ListQuery::front(ResourceKind::Posts)
            .with_page(2)
            .with_category("rust");
        let b = ListQuery::front(ResourceKind::Posts)
            .with_page(2)
            .with_category("rust");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn each_parameter_distinguishes_keys() {
        let base = ListQuery::front(ResourceKind::Posts);
        assert_ne!(base.cache_key(), base.clone().with_page(2).cache_key());
        assert_ne!(
            base.cache_key(),
            base.clone().with_category("rust").cache_key()
        );
        assert_ne!(
            base.cache_key(),
            base.clone().with_search("cache").cache_key()
        );
        assert_ne!(
            base.cache_key(),
            ListQuery::front(ResourceKind::Pages).cache_key()
        );
    }

    #[test]
    fn filter_values_cannot_collide_with_key_structure() {
        let tricky = ListQuery::front(ResourceKind::Posts).with_category("a&search=b");
        let plain = ListQuery::front(ResourceKind::Posts)
            .with_category("a")
            .with_search("b");
        assert_ne!(tricky.cache_key(), plain.cache_key());
    }

    #[test]
    fn key_is_readable() {
        let key = ListQuery::front(ResourceKind::Posts).cache_key();
        assert_eq!(key.as_str(), "posts?page=1");
    }

    #[test]
    fn detail_keys_vary_by_slug_and_resource() {
        let a = DetailQuery::new(ResourceKind::Posts, "hello-world");
        let b = DetailQuery::new(ResourceKind::Posts, "hello-world");
        assert_eq!(a.cache_key(), b.cache_key());

        assert_ne!(
            a.cache_key(),
            DetailQuery::new(ResourceKind::Posts, "other").cache_key()
        );
        assert_ne!(
            a.cache_key(),
            DetailQuery::new(ResourceKind::Pages, "hello-world").cache_key()
        );
        assert_eq!(a.cache_key().as_str(), "posts/hello-world");
    }

    #[test]
    fn detail_and_list_keys_never_collide() {
        // List keys percent-encode filter values, so they cannot contain
        // a raw slash; detail keys always carry one.
        let list = ListQuery::front(ResourceKind::Posts)
            .with_search("posts/page=1")
            .cache_key();
        let detail = DetailQuery::new(ResourceKind::Posts, "page=1").cache_key();
        assert_ne!(list, detail);
        assert!(!list.as_str().contains('/'));
        assert!(detail.as_str().contains('/'));
    }
}
