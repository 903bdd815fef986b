//! In-memory snippet retrieval.
//!
//! A [`SnippetIndex`] holds the raw search snippets for one gather call and
//! ranks them against the learning objectives. Each objective (objectives are
//! comma/semicolon/period separated) is fuzzy-matched against every snippet;
//! a snippet's relevance is the sum of its per-objective matches.

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

/// A throwaway index over the snippets of a single gather call.
pub struct SnippetIndex {
    matcher: SkimMatcherV2,
    snippets: Vec<String>,
}

impl Default for SnippetIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetIndex {
    pub fn new() -> Self {
        Self {
            matcher: SkimMatcherV2::default().ignore_case(),
            snippets: Vec::new(),
        }
    }

    pub fn add_documents<I, S>(&mut self, documents: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.snippets.extend(
            documents
                .into_iter()
                .map(Into::into)
                .filter(|doc: &String| !doc.trim().is_empty()),
        );
    }

    fn score(&self, snippet: &str, terms: &[&str]) -> i64 {
        terms
            .iter()
            .filter_map(|term| self.matcher.fuzzy_match(snippet, term))
            .sum()
    }

    /// Returns the `n_results` best matching snippets joined by blank lines.
    ///
    /// Snippets matching no objective at all are never returned, so the result
    /// is empty when nothing is relevant.
    pub fn retrieve(&self, query: &str, n_results: usize) -> String {
        let terms = query_terms(query);
        if terms.is_empty() {
            return String::new();
        }

        let mut ranked: Vec<(i64, usize)> = self
            .snippets
            .iter()
            .enumerate()
            .map(|(idx, snippet)| (self.score(snippet, &terms), idx))
            .filter(|(score, _)| *score > 0)
            .collect();
        // Highest score first; ties keep search order.
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        ranked
            .into_iter()
            .take(n_results)
            .map(|(_, idx)| self.snippets[idx].as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn query_terms(query: &str) -> Vec<&str> {
    query
        .split([',', ';', '.', '\n'])
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .collect()
}
