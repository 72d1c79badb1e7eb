//! Careers page resolution.
//!
//! Companies are usually registered with their home page. Before an index
//! scan the domain is mapped to its job listings page: a web search for
//! careers pages on the domain, then an LLM pick among the results. Answers
//! are cached per domain.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::ai::prompts::careers_url_prompt;
use crate::ai::{BaseAI, CompletionRequest};
use crate::cache::KvCache;
use crate::error::{SourceError, SourceResult};
use crate::links;

const SERPAPI_URL: &str = "https://serpapi.com/search";

/// A single organic search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    pub link: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<SearchHit>>;
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SearchHit>,
}

/// Google search through SerpAPI.
pub struct SerpApiSearch {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SerpApiSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: SERPAPI_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl WebSearch for SerpApiSearch {
    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<SearchHit>> {
        let limit = limit.to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                ("q", query),
                ("num", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SourceError::Search(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SourceError::Search(format!("status {status}: {body}")));
        }

        let body: SerpApiResponse = resp
            .json()
            .await
            .map_err(|e| SourceError::Search(e.to_string()))?;
        Ok(body.organic_results)
    }
}

pub struct CareersUrlResolver {
    search: Arc<dyn WebSearch>,
    ai: Arc<dyn BaseAI>,
    model: String,
    cache: Arc<dyn KvCache>,
}

impl CareersUrlResolver {
    pub fn new(
        search: Arc<dyn WebSearch>,
        ai: Arc<dyn BaseAI>,
        model: impl Into<String>,
        cache: Arc<dyn KvCache>,
    ) -> Self {
        Self {
            search,
            ai,
            model: model.into(),
            cache,
        }
    }

    /// The job listings page for the site `url` belongs to. Falls back to
    /// `url` itself whenever resolution fails.
    pub async fn resolve(&self, url: &str) -> String {
        let Some(domain) = links::host_of(url).or_else(|| links::host_of(&with_scheme(url)))
        else {
            tracing::warn!(url, "Cannot resolve careers page for unparseable URL");
            return url.to_string();
        };

        match self.cache.get(&domain).await {
            Ok(Some(cached)) => {
                tracing::debug!(domain = %domain, careers_url = %cached, "Careers page from cache");
                return cached;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(domain = %domain, error = %e, "Careers cache read failed"),
        }

        match self.lookup(&domain).await {
            Ok(careers_url) => {
                tracing::info!(domain = %domain, careers_url = %careers_url, "Resolved careers page");
                if let Err(e) = self.cache.put(&domain, &careers_url).await {
                    tracing::warn!(domain = %domain, error = %e, "Careers cache write failed");
                }
                careers_url
            }
            Err(e) => {
                tracing::warn!(domain = %domain, error = %e, "Careers page resolution failed");
                url.to_string()
            }
        }
    }

    async fn lookup(&self, domain: &str) -> SourceResult<String> {
        let query = format!("site:{domain} careers jobs apply");
        let hits = self.search.search(&query, 10).await?;
        if hits.is_empty() {
            return Err(SourceError::Search(format!("no results for {query}")));
        }

        let candidates: Vec<(String, String)> =
            hits.into_iter().map(|h| (h.title, h.link)).collect();
        let request = CompletionRequest::new(&self.model, careers_url_prompt(domain, &candidates))
            .with_temperature(0.2);
        let answer = self.ai.complete(&request).await?;

        let cleaned = answer
            .trim()
            .trim_matches(|c| c == '"' || c == '`' || c == '\'')
            .trim();
        let candidate = with_scheme(cleaned);
        match Url::parse(&candidate) {
            Ok(parsed)
                if matches!(parsed.scheme(), "http" | "https")
                    && parsed.host_str().is_some_and(|h| h.contains('.')) =>
            {
                Ok(candidate)
            }
            _ => Err(SourceError::InvalidUrl { url: answer }),
        }
    }
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}
