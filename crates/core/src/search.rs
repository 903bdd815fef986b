//! Web search used by the content gatherer.

use async_trait::async_trait;
use serde::Deserialize;

const BRAVE_WEB_SEARCH_URL: &str = "https://api.search.brave.com/res/v1/web/search";

/// Error type for web search providers.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Web search request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse search response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited by search provider")]
    RateLimited,
}

/// Anything that can turn a query into text snippets.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Returns up to `max_results` snippet bodies for `query`, best first.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError>;
}

/// Searches the web via the Brave Search API.
#[derive(Debug, Clone)]
pub struct BraveSearch {
    client: reqwest::Client,
    api_key: String,
}

impl BraveSearch {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }
}

// -- Brave API response types (private, only model what we need) --

#[derive(Debug, Deserialize)]
struct BraveApiResponse {
    #[serde(default)]
    web: Option<BraveWebResults>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResults {
    #[serde(default)]
    results: Vec<BraveWebResult>,
}

#[derive(Debug, Deserialize)]
struct BraveWebResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

fn snippets_from_response(body: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
    let response: BraveApiResponse =
        serde_json::from_str(body).map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

    Ok(response
        .web
        .map(|web| web.results)
        .unwrap_or_default()
        .into_iter()
        .filter(|r| !r.description.trim().is_empty())
        .take(max_results)
        .map(|r| {
            if r.title.is_empty() {
                r.description
            } else {
                format!("{}: {}", r.title, r.description)
            }
        })
        .collect())
}

#[async_trait]
impl SearchProvider for BraveSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, SearchError> {
        let count = max_results.clamp(1, 20).to_string();
        let response = self
            .client
            .get(BRAVE_WEB_SEARCH_URL)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::RequestFailed(format!(
                "Brave Search API error {}: {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;
        snippets_from_response(&body, max_results)
    }
}
