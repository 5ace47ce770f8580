//! Context assembly from ranked results.
//!
//! Builds the text handed to the answer step:
//! 1. the `content` of the top ranked results, joined by blank lines
//! 2. a source list of `- {file_name} ({relevance}%)` lines

use serde::{Deserialize, Serialize};

use super::ranker::ScoredResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBuilderConfig {
    /// Maximum number of ranked results whose content is included
    pub context_documents: usize,
}

impl Default for ContextBuilderConfig {
    fn default() -> Self {
        Self {
            context_documents: 10,
        }
    }
}

pub struct RankedContextBuilder {
    config: ContextBuilderConfig,
}

impl Default for RankedContextBuilder {
    fn default() -> Self {
        Self::new(ContextBuilderConfig::default())
    }
}

impl RankedContextBuilder {
    pub fn new(config: ContextBuilderConfig) -> Self {
        Self { config }
    }

    /// Content of the first `context_documents` results, in rank order.
    pub fn build_context(&self, results: &[ScoredResult]) -> String {
        results
            .iter()
            .take(self.config.context_documents)
            .map(|r| r.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn source_list(&self, results: &[ScoredResult]) -> String {
        results
            .iter()
            .map(|r| format!("- {} ({:.1}%)", r.file_name, r.relevance))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
