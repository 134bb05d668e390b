// Web-search upstream with a bounded response cache in front.

use async_trait::async_trait;
use confab_cache::BoundedCache;
use confab_types::CachePolicy;
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    pub query: String,
    /// Results per page (provider-bounded, typically 1-10).
    pub num: usize,
    /// 1-based pagination start index.
    pub start: usize,
    /// Optional language restriction, e.g. `lang_el`.
    pub language: Option<String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            num: 10,
            start: 1,
            language: None,
        }
    }

    pub fn with_page(mut self, num: usize, start: usize) -> Self {
        self.num = num;
        self.start = start;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Composite cache key: the same query text with different pagination
    /// or language is a different cached response.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.query,
            self.num,
            self.start,
            self.language.as_deref().unwrap_or("")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Seam between the cache wrapper and the concrete HTTP client.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;
}

pub struct SearchClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SearchClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ProviderError::Config(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let response = self.http.post(&self.endpoint).json(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message: "search request failed".to_owned(),
            });
        }
        Ok(response.json().await?)
    }
}

/// Cache-fronted search: a hit is synchronous and never touches the
/// network; only a miss triggers the suspending fetch path.
pub struct CachedSearchClient<B = SearchClient> {
    inner: B,
    cache: BoundedCache<String, SearchResponse>,
}

impl<B: SearchBackend> CachedSearchClient<B> {
    pub fn new(inner: B, policy: CachePolicy) -> Self {
        Self {
            inner,
            cache: BoundedCache::new(policy.capacity, policy.ttl),
        }
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        let key = query.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(query = %query.query, "search cache hit");
            return Ok(hit);
        }
        let response = self.inner.search(query).await?;
        self.cache.insert(key, response.clone());
        Ok(response)
    }
}
