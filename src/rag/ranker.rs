//! Relevance ranking for similarity-search hits.
//!
//! Turns raw `(document_id, distance, content)` matches into a deduplicated,
//! normalized, ranked result list:
//! 1. [`deduplicate`]: one best match per document id
//! 2. [`normalize`]: per-batch min-max scaling of distances into [2, 100]
//! 3. [`rank`]: stable sort by relevance, 1-based ranks, top-k cut
//! 4. [`enrich`]: display metadata from a [`MetadataLookup`], placeholders on miss
//!
//! Relevance only has meaning relative to the other results of the same batch.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// Bottom of the relevance range (farthest match in a batch).
pub const RELEVANCE_FLOOR: f64 = 2.0;
/// Width of the relevance range; `FLOOR + SPAN` is the ceiling.
pub const RELEVANCE_SPAN: f64 = 98.0;
pub const RELEVANCE_CEILING: f64 = RELEVANCE_FLOOR + RELEVANCE_SPAN;
/// Score given to every match when all distances in a batch are equal.
pub const DEGENERATE_RELEVANCE: f64 = 100.0;

pub const DEFAULT_PREVIEW_CHARS: usize = 100;

pub const UNKNOWN_FILE_NAME: &str = "unknown";
pub const UNKNOWN_LOCATION: &str = "no location on record";
pub const NO_SUMMARY: &str = "no summary";
pub const NO_KEYWORDS: &str = "no keywords";

/// One similarity-search hit. Smaller `distance` means closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatch {
    pub document_id: Option<String>,
    pub distance: f64,
    pub content: String,
}

impl RawMatch {
    pub fn new(document_id: impl Into<String>, distance: f64, content: impl Into<String>) -> Self {
        Self {
            document_id: Some(document_id.into()),
            distance,
            content: content.into(),
        }
    }
}

/// Best match per document id, iterated in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct BestMatches {
    order: Vec<String>,
    best: HashMap<String, RawMatch>,
}

impl BestMatches {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, document_id: &str) -> Option<&RawMatch> {
        self.best.get(document_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawMatch)> {
        self.order
            .iter()
            .filter_map(|id| self.best.get(id).map(|m| (id.as_str(), m)))
    }

    pub fn distances(&self) -> Vec<f64> {
        self.iter().map(|(_, m)| m.distance).collect()
    }
}

/// Display metadata for a document, as kept by the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub file_location: Option<String>,
    pub summary: Option<String>,
    pub keywords: Option<String>,
    pub doc_type: Option<String>,
}

/// Outcome of a metadata lookup; a miss is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(DocumentMetadata),
    NotFound,
}

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup(&self, document_id: &str) -> Result<Lookup, ApiError>;
}

/// One ranked output entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub document_id: String,
    pub rank: usize,
    pub relevance: f64,
    pub distance: f64,
    pub content: String,
    pub file_name: String,
    pub file_location: String,
    pub summary: String,
    pub keywords: String,
    pub doc_type: String,
}

impl ScoredResult {
    fn unenriched(document_id: &str, rank: usize, relevance: f64, matched: &RawMatch) -> Self {
        Self {
            document_id: document_id.to_string(),
            rank,
            relevance,
            distance: matched.distance,
            content: matched.content.clone(),
            file_name: UNKNOWN_FILE_NAME.to_string(),
            file_location: UNKNOWN_LOCATION.to_string(),
            summary: NO_SUMMARY.to_string(),
            keywords: NO_KEYWORDS.to_string(),
            doc_type: String::new(),
        }
    }

    fn apply_metadata(&mut self, metadata: DocumentMetadata, preview_chars: usize) {
        self.file_name =
            non_blank(Some(metadata.file_name)).unwrap_or_else(|| UNKNOWN_FILE_NAME.into());
        self.file_location =
            non_blank(metadata.file_location).unwrap_or_else(|| UNKNOWN_LOCATION.into());
        self.summary = summary_preview(
            non_blank(metadata.summary).as_deref().unwrap_or(NO_SUMMARY),
            preview_chars,
        );
        self.keywords = non_blank(metadata.keywords).unwrap_or_else(|| NO_KEYWORDS.into());
        self.doc_type = metadata.doc_type.unwrap_or_default();
    }
}

/// Persisted shape of a ranked result (search history).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rank: usize,
    pub file_name: String,
    pub file_location: String,
    pub relevance: f64,
    pub keywords: String,
    pub summary: String,
    pub content: String,
}

impl From<&ScoredResult> for RankingEntry {
    fn from(result: &ScoredResult) -> Self {
        Self {
            rank: result.rank,
            file_name: result.file_name.clone(),
            file_location: result.file_location.clone(),
            relevance: result.relevance,
            keywords: result.keywords.clone(),
            summary: result.summary.clone(),
            content: result.content.clone(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Keeps the best (smallest-distance) match per document id.
///
/// Matches without an id or with a blank one, with blank content, or with a non-finite distance
/// are dropped. Equal distances keep the first-seen match; a document keeps
/// the position where its id was first seen.
pub fn deduplicate<I>(matches: I) -> BestMatches
where
    I: IntoIterator<Item = RawMatch>,
{
    let mut result = BestMatches::default();

    for candidate in matches {
        let Some(document_id) = non_blank(candidate.document_id.clone()) else {
            tracing::debug!("Dropping match without document id");
            continue;
        };
        if candidate.content.trim().is_empty() || !candidate.distance.is_finite() {
            tracing::debug!(document_id = %document_id, "Dropping unusable match");
            continue;
        }

        match result.best.get_mut(&document_id) {
            Some(existing) => {
                if candidate.distance < existing.distance {
                    *existing = candidate;
                }
            }
            None => {
                result.order.push(document_id.clone());
                result.best.insert(document_id, candidate);
            }
        }
    }

    result
}

/// Min-max scales distances into relevance scores in `[2, 100]`.
///
/// The closest distance maps to 100 and the farthest to 2. When all distances
/// are equal every score is [`DEGENERATE_RELEVANCE`]. Scores are rounded to one
/// decimal and clamped to the range.
pub fn normalize(distances: &[f64]) -> Vec<f64> {
    let Some(min_d) = distances.iter().copied().reduce(f64::min) else {
        return Vec::new();
    };
    let max_d = distances.iter().copied().fold(min_d, f64::max);
    let spread = max_d - min_d;

    distances
        .iter()
        .map(|&d| {
            if spread <= 0.0 {
                return DEGENERATE_RELEVANCE;
            }
            let raw = (1.0 - (d - min_d) / spread) * RELEVANCE_SPAN + RELEVANCE_FLOOR;
            round_one_decimal(raw).clamp(RELEVANCE_FLOOR, RELEVANCE_CEILING)
        })
        .collect()
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Orders deduplicated matches by relevance and assigns ranks `1..=n`.
///
/// `relevance` is parallel to `best.iter()`. The sort is stable, so ties keep
/// first-seen order. At most `top_k` results are returned.
pub fn rank(best: &BestMatches, relevance: &[f64], top_k: usize) -> Vec<ScoredResult> {
    let mut scored: Vec<(&str, &RawMatch, f64)> = best
        .iter()
        .zip(relevance.iter().copied())
        .map(|((id, matched), score)| (id, matched, score))
        .collect();

    scored.sort_by(|a, b| b.2.total_cmp(&a.2));
    scored.truncate(top_k);

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (id, matched, score))| ScoredResult::unenriched(id, idx + 1, score, matched))
        .collect()
}

/// First `max_chars` characters of `summary`, with `...` when cut.
pub fn summary_preview(summary: &str, max_chars: usize) -> String {
    let mut chars = summary.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Fills display metadata for each result, one lookup at a time.
///
/// A miss, an error, or a lookup exceeding `timeout` leaves the placeholders
/// in place; enrichment never fails the batch.
pub async fn enrich(
    mut results: Vec<ScoredResult>,
    lookup: &dyn MetadataLookup,
    preview_chars: usize,
    timeout: Duration,
) -> Vec<ScoredResult> {
    for result in &mut results {
        match tokio::time::timeout(timeout, lookup.lookup(&result.document_id)).await {
            Ok(Ok(Lookup::Found(metadata))) => result.apply_metadata(metadata, preview_chars),
            Ok(Ok(Lookup::NotFound)) => {
                tracing::info!(document_id = %result.document_id, "No metadata for document");
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    document_id = %result.document_id,
                    "Metadata lookup failed: {}",
                    err
                );
            }
            Err(_) => {
                tracing::warn!(
                    document_id = %result.document_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Metadata lookup timed out"
                );
            }
        }
    }
    results
}

/// Runs the full ranking sequence over one batch of matches.
#[derive(Debug, Clone)]
pub struct RelevanceRanker {
    preview_chars: usize,
    lookup_timeout: Duration,
}

impl Default for RelevanceRanker {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_CHARS, Duration::from_secs(2))
    }
}

impl RelevanceRanker {
    pub fn new(preview_chars: usize, lookup_timeout: Duration) -> Self {
        Self {
            preview_chars,
            lookup_timeout,
        }
    }

    /// Deduplicate, normalize, and rank without touching metadata.
    pub fn score<I>(&self, matches: I, top_k: usize) -> Vec<ScoredResult>
    where
        I: IntoIterator<Item = RawMatch>,
    {
        let best = deduplicate(matches);
        if best.is_empty() {
            return Vec::new();
        }
        let relevance = normalize(&best.distances());
        rank(&best, &relevance, top_k)
    }

    pub async fn rank_and_enrich<I>(
        &self,
        matches: I,
        top_k: usize,
        lookup: &dyn MetadataLookup,
    ) -> Vec<ScoredResult>
    where
        I: IntoIterator<Item = RawMatch>,
    {
        let ranked = self.score(matches, top_k);
        tracing::debug!(results = ranked.len(), top_k, "Ranked matches");
        enrich(ranked, lookup, self.preview_chars, self.lookup_timeout).await
    }
}
