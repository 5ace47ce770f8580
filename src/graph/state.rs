// Graph State
// SearchState carried through the search pipeline

use serde::{Deserialize, Serialize};

use crate::rag::ScoredResult;

/// State threaded through extractor -> retrieval -> answer -> formatter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchState {
    /// Original user query
    pub query: String,
    /// Vector collection searched by the retrieval step
    pub collection: String,
    pub top_k: usize,

    /// Comma-separated search keywords (falls back to the query)
    pub keywords: String,
    /// Ranked, enriched results
    pub results: Vec<ScoredResult>,
    /// Answer context built from the top results
    pub context: String,
    /// Model answer, or a fixed fallback text
    pub answer: String,
    /// Final plain-text report
    pub report: String,

    /// Steps that fell back to a default instead of failing the run
    pub degraded: Vec<String>,
}

impl SearchState {
    pub fn new(query: impl Into<String>, collection: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            collection: collection.into(),
            top_k,
            ..Self::default()
        }
    }

    pub fn note_degraded(&mut self, step: &str, reason: impl std::fmt::Display) {
        tracing::warn!(step, "Search step degraded: {}", reason);
        self.degraded.push(format!("{}: {}", step, reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_empty() {
        let state = SearchState::new("rust book", "20240101_000000", 5);
        assert_eq!(state.query, "rust book");
        assert_eq!(state.top_k, 5);
        assert!(state.results.is_empty());
        assert!(state.degraded.is_empty());
    }

    #[test]
    fn degraded_steps_are_recorded() {
        let mut state = SearchState::default();
        state.note_degraded("extractor", "model offline");
        assert_eq!(state.degraded, vec!["extractor: model offline"]);
    }
}
