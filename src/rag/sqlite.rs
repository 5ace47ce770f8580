//! SQLite-backed vector index.
//!
//! Chunk metadata and embeddings live in SQLite; search is brute-force
//! cosine distance over one collection.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::ranker::RawMatch;
use super::store::{CollectionInfo, StoredChunk, VectorIndex};
use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.index_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                document_count INTEGER NOT NULL DEFAULT 0,
                chunk_count INTEGER NOT NULL DEFAULT 0,
                embedding_model TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS chunks (
                chunk_id TEXT PRIMARY KEY,
                collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
                document_id TEXT NOT NULL,
                content TEXT NOT NULL,
                chunk_index INTEGER NOT NULL DEFAULT 0,
                start_offset INTEGER NOT NULL DEFAULT 0,
                embedding BLOB
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_collection ON chunks(collection)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    /// `1 - cosine_similarity`, in [0, 2]. Mismatched or zero vectors are
    /// treated as orthogonal.
    fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return 1.0;
        }

        let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
        let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f64::EPSILON {
            1.0
        } else {
            1.0 - (dot / denom).clamp(-1.0, 1.0)
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, ApiError> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT name FROM collections WHERE name = ?1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(ApiError::internal)?;
        Ok(found.is_some())
    }

    fn row_to_info(row: &sqlx::sqlite::SqliteRow) -> CollectionInfo {
        let document_count: i64 = row.get("document_count");
        let chunk_count: i64 = row.get("chunk_count");
        CollectionInfo {
            name: row.get("name"),
            document_count: document_count.max(0) as usize,
            chunk_count: chunk_count.max(0) as usize,
            embedding_model: row.get("embedding_model"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn create_collection(&self, info: &CollectionInfo) -> Result<(), ApiError> {
        if self.collection_exists(&info.name).await? {
            return Err(ApiError::BadRequest(format!(
                "Collection already exists: {}",
                info.name
            )));
        }

        sqlx::query(
            "INSERT INTO collections (name, document_count, chunk_count, embedding_model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&info.name)
        .bind(info.document_count as i64)
        .bind(info.chunk_count as i64)
        .bind(&info.embedding_model)
        .bind(&info.created_at)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    async fn insert_batch(
        &self,
        collection: &str,
        items: Vec<(StoredChunk, Vec<f32>)>,
    ) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }
        if !self.collection_exists(collection).await? {
            return Err(ApiError::NotFound(format!("Collection not found: {}", collection)));
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (chunk, embedding) in &items {
            sqlx::query(
                "INSERT OR REPLACE INTO chunks
                    (chunk_id, collection, document_id, content, chunk_index, start_offset, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&chunk.chunk_id)
            .bind(collection)
            .bind(&chunk.document_id)
            .bind(&chunk.content)
            .bind(chunk.chunk_index as i64)
            .bind(chunk.start_offset as i64)
            .bind(Self::serialize_embedding(embedding))
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        sqlx::query(
            "UPDATE collections
             SET chunk_count = (SELECT COUNT(*) FROM chunks WHERE collection = ?1)
             WHERE name = ?1",
        )
        .bind(collection)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<RawMatch>, ApiError> {
        if !self.collection_exists(collection).await? {
            return Err(ApiError::NotFound(format!("Collection not found: {}", collection)));
        }

        let rows = sqlx::query(
            "SELECT document_id, content, embedding
             FROM chunks
             WHERE collection = ?1
             ORDER BY chunk_id",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut scored: Vec<RawMatch> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Option<Vec<u8>> = row.get("embedding");
                let embedding_bytes = embedding_bytes.filter(|b| !b.is_empty())?;
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let document_id: String = row.get("document_id");

                Some(RawMatch {
                    document_id: Some(document_id).filter(|id| !id.is_empty()),
                    distance: Self::cosine_distance(query_embedding, &stored),
                    content: row.get("content"),
                })
            })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k.max(1));

        Ok(scored)
    }

    async fn list_collections(&self) -> Result<Vec<CollectionInfo>, ApiError> {
        let rows = sqlx::query(
            "SELECT name, document_count, chunk_count, embedding_model, created_at
             FROM collections
             ORDER BY name DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows.iter().map(Self::row_to_info).collect())
    }

    async fn latest_collection(&self) -> Result<Option<String>, ApiError> {
        sqlx::query_scalar("SELECT name FROM collections ORDER BY name DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("DELETE FROM chunks WHERE collection = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        let result = sqlx::query("DELETE FROM collections WHERE name = ?1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_index() -> SqliteVectorIndex {
        let tmp = std::env::temp_dir().join(format!(
            "docseek-index-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteVectorIndex::with_path(tmp).await.unwrap()
    }

    fn info(name: &str) -> CollectionInfo {
        CollectionInfo {
            name: name.to_string(),
            document_count: 2,
            chunk_count: 0,
            embedding_model: "embed".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    fn chunk(id: &str, document_id: &str, content: &str) -> StoredChunk {
        StoredChunk {
            chunk_id: id.to_string(),
            document_id: document_id.to_string(),
            content: content.to_string(),
            chunk_index: 0,
            start_offset: 0,
        }
    }

    #[test]
    fn cosine_distance_bounds() {
        assert!(SqliteVectorIndex::cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-9);
        assert!((SqliteVectorIndex::cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((SqliteVectorIndex::cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-9);
        assert_eq!(SqliteVectorIndex::cosine_distance(&[1.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn search_returns_ascending_distance() {
        let index = test_index().await;
        index.create_collection(&info("20240101_000000")).await.unwrap();
        index
            .insert_batch(
                "20240101_000000",
                vec![
                    (chunk("c1", "1", "far"), vec![0.0, 1.0]),
                    (chunk("c2", "2", "near"), vec![1.0, 0.1]),
                    (chunk("c3", "1", "exact"), vec![1.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        let results = index.search("20240101_000000", &[1.0, 0.0], 10).await.unwrap();
        let contents: Vec<&str> = results.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["exact", "near", "far"]);
        assert_eq!(results[0].document_id.as_deref(), Some("1"));

        let top = index.search("20240101_000000", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(top.len(), 1);

        let listed = index.list_collections().await.unwrap();
        assert_eq!(listed[0].chunk_count, 3);
    }

    #[tokio::test]
    async fn unknown_collection_is_not_found() {
        let index = test_index().await;
        let err = index.search("missing", &[1.0], 5).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn latest_and_delete_collections() {
        let index = test_index().await;
        assert_eq!(index.latest_collection().await.unwrap(), None);

        index.create_collection(&info("20240101_000000")).await.unwrap();
        index.create_collection(&info("20240305_120000")).await.unwrap();
        assert!(index.create_collection(&info("20240101_000000")).await.is_err());

        assert_eq!(
            index.latest_collection().await.unwrap().as_deref(),
            Some("20240305_120000")
        );

        assert!(index.delete_collection("20240305_120000").await.unwrap());
        assert!(!index.delete_collection("20240305_120000").await.unwrap());
        assert_eq!(
            index.latest_collection().await.unwrap().as_deref(),
            Some("20240101_000000")
        );
    }
}
