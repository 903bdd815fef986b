//! Content Gathering
//!
//! Produces the study material for a checkpoint: search the web, keep the
//! snippets that best match the objectives, then have the backend turn them
//! into a study guide. Gathering never fails; when search itself fails the
//! material is the [`GATHER_ERROR_SENTINEL`] and validation will score it low.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::llm_client::TutorBackend;
use crate::retrieval::SnippetIndex;
use crate::search::SearchProvider;

/// Study material recorded when the search step fails.
pub const GATHER_ERROR_SENTINEL: &str = "Error gathering context.";

/// Default text appended to the topic when searching.
pub const DEFAULT_QUERY_SUFFIX: &str = "machine learning deep learning tutorial explanation";

const MAX_SEARCH_RESULTS: usize = 8;
const RETRIEVED_SNIPPETS: usize = 3;
const FALLBACK_SNIPPETS: usize = 2;
const MAX_CONTEXT_CHARS: usize = 2500;

/// Produces study text for a topic.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGatherer: Send + Sync {
    /// Always returns text; failures are reported through [`GATHER_ERROR_SENTINEL`].
    async fn gather(&self, topic: &str, objectives: &str) -> String;
}

/// True when `context` is the gatherer's failure sentinel.
pub fn is_degraded(context: &str) -> bool {
    context.contains(GATHER_ERROR_SENTINEL)
}

/// Gathers material from web search, snippet retrieval and LLM summarization.
pub struct WebContentGatherer {
    search: Arc<dyn SearchProvider>,
    backend: Arc<dyn TutorBackend>,
    query_suffix: String,
}

impl WebContentGatherer {
    pub fn new(search: Arc<dyn SearchProvider>, backend: Arc<dyn TutorBackend>) -> Self {
        Self {
            search,
            backend,
            query_suffix: DEFAULT_QUERY_SUFFIX.to_string(),
        }
    }

    pub fn with_query_suffix(self, query_suffix: impl Into<String>) -> Self {
        Self {
            query_suffix: query_suffix.into(),
            ..self
        }
    }

    fn query_for(&self, topic: &str) -> String {
        if self.query_suffix.is_empty() {
            topic.to_string()
        } else {
            format!("{} {}", topic, self.query_suffix)
        }
    }
}

/// Truncates to at most `max_chars` characters without splitting one.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[async_trait]
impl ContentGatherer for WebContentGatherer {
    async fn gather(&self, topic: &str, objectives: &str) -> String {
        let query = self.query_for(topic);
        info!(%topic, %query, "Gathering study material");

        let raw_results = match self.search.search(&query, MAX_SEARCH_RESULTS).await {
            Ok(results) => results,
            Err(e) => {
                warn!(%topic, error = %e, "Search failed");
                return GATHER_ERROR_SENTINEL.to_string();
            }
        };

        // A fresh index per call keeps collections private to one checkpoint.
        let mut index = SnippetIndex::new();
        index.add_documents(raw_results.iter().cloned());

        let mut refined = index.retrieve(objectives, RETRIEVED_SNIPPETS);
        if refined.is_empty() {
            refined = raw_results
                .iter()
                .take(FALLBACK_SNIPPETS)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n");
        }
        let refined = truncate_chars(&refined, MAX_CONTEXT_CHARS);

        match self.backend.summarize(topic, objectives, refined).await {
            Ok(formatted) => formatted,
            Err(e) => {
                warn!(%topic, error = %e, "Summarization failed, using retrieved snippets");
                refined.to_string()
            }
        }
    }
}
