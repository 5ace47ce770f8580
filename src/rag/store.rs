//! VectorIndex trait: abstract interface for chunk embedding storage.
//!
//! Chunks live in named collections, one per index build. The primary
//! implementation is `SqliteVectorIndex` in the `sqlite` module.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::ranker::RawMatch;
use crate::core::errors::ApiError;

/// Collection names are build timestamps in this format.
pub const COLLECTION_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn collection_name_at(at: DateTime<Local>) -> String {
    at.format(COLLECTION_NAME_FORMAT).to_string()
}

/// A stored chunk of document text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub chunk_id: String,
    /// Relational id of the document the chunk was cut from.
    pub document_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub start_offset: usize,
}

/// One row of the `collections` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: usize,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub created_at: String,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Register a new, empty collection. Fails if the name is taken.
    async fn create_collection(&self, info: &CollectionInfo) -> Result<(), ApiError>;

    /// Insert chunks with their embedding vectors into an existing collection.
    async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError>;

    /// Up to `k` nearest chunks in ascending distance order.
    ///
    /// Unknown collections are `ApiError::NotFound`.
    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RawMatch>, ApiError>;

    /// All collections, newest first.
    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ApiError>;

    /// Name of the most recently built collection, if any.
    async fn latest_collection(&self) -> Result<Option<String>, ApiError>;

    /// Remove a collection and its chunks. Returns whether it existed.
    async fn delete_collection(&self, name: &str) -> Result<bool, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn collection_names_sort_chronologically() {
        let early = Local.with_ymd_and_hms(2024, 3, 9, 8, 5, 1).unwrap();
        let late = Local.with_ymd_and_hms(2024, 11, 2, 17, 0, 0).unwrap();

        assert_eq!(collection_name_at(early), "20240309_080501");
        assert!(collection_name_at(early) < collection_name_at(late));
    }
}
