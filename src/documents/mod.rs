use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;
use crate::rag::ranker::{DocumentMetadata, Lookup, MetadataLookup};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub keywords: String,
    pub file_location: String,
    pub file_name: String,
    pub doc_type: String,
    pub created_at: String,
}

/// Fields of a document about to be stored.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub summary: String,
    pub keywords: String,
    pub file_location: String,
    pub file_name: String,
    pub doc_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// A document with the same file name is already stored.
    Duplicate,
}

/// Input for index building: id plus the text that gets embedded.
#[derive(Debug, Clone)]
pub struct IndexSource {
    pub id: i64,
    pub title: String,
    pub summary: String,
}

#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to document db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL DEFAULT '',
                summary TEXT NOT NULL DEFAULT '',
                keywords TEXT NOT NULL DEFAULT '',
                file_location TEXT NOT NULL DEFAULT '',
                file_name TEXT NOT NULL UNIQUE,
                doc_type TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init documents table: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn insert_document(&self, doc: &NewDocument) -> Result<InsertOutcome, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO documents (title, summary, keywords, file_location, file_name, doc_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(file_name) DO NOTHING",
        )
        .bind(&doc.title)
        .bind(&doc.summary)
        .bind(&doc.keywords)
        .bind(&doc.file_location)
        .bind(&doc.file_name)
        .bind(&doc.doc_type)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to insert document: {}", e)))?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Inserted(result.last_insert_rowid()))
    }

    pub async fn exists_by_file_name(&self, file_name: &str) -> Result<bool, ApiError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM documents WHERE file_name = ?")
            .bind(file_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(found.is_some())
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ApiError> {
        let rows = sqlx::query("SELECT * FROM documents ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    pub async fn get_document(&self, id: i64) -> Result<Option<DocumentRecord>, ApiError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(row.as_ref().map(row_to_record))
    }

    pub async fn delete_document(&self, id: i64) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(&self) -> Result<i64, ApiError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    pub async fn load_index_sources(&self) -> Result<Vec<IndexSource>, ApiError> {
        let rows = sqlx::query("SELECT id, title, summary FROM documents ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(rows
            .iter()
            .map(|row| IndexSource {
                id: row.try_get("id").unwrap_or_default(),
                title: row.try_get("title").unwrap_or_default(),
                summary: row.try_get("summary").unwrap_or_default(),
            })
            .collect())
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> DocumentRecord {
    DocumentRecord {
        id: row.try_get("id").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        summary: row.try_get("summary").unwrap_or_default(),
        keywords: row.try_get("keywords").unwrap_or_default(),
        file_location: row.try_get("file_location").unwrap_or_default(),
        file_name: row.try_get("file_name").unwrap_or_default(),
        doc_type: row.try_get("doc_type").unwrap_or_default(),
        created_at: row.try_get("created_at").unwrap_or_default(),
    }
}

#[async_trait]
impl MetadataLookup for DocumentStore {
    async fn lookup(&self, document_id: &str) -> Result<Lookup, ApiError> {
        let Ok(id) = document_id.trim().parse::<i64>() else {
            return Ok(Lookup::NotFound);
        };

        Ok(match self.get_document(id).await? {
            Some(record) => Lookup::Found(DocumentMetadata {
                file_name: record.file_name,
                file_location: Some(record.file_location),
                summary: Some(record.summary),
                keywords: Some(record.keywords),
                doc_type: Some(record.doc_type),
            }),
            None => Lookup::NotFound,
        })
    }
}
