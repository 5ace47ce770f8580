use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;
use crate::rag::RankingEntry;

pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: i64,
    pub query: String,
    pub report: String,
    pub ai_answer: String,
    pub ranking: Vec<RankingEntry>,
    pub layout_path: Option<String>,
    pub bar_chart_path: Option<String>,
    pub collection: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewSearchRecord {
    pub query: String,
    pub report: String,
    pub ai_answer: String,
    pub ranking: Vec<RankingEntry>,
    pub layout_path: Option<String>,
    pub bar_chart_path: Option<String>,
    pub collection: Option<String>,
}

#[derive(Clone)]
pub struct SearchHistoryStore {
    pool: SqlitePool,
}

impl SearchHistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to connect to history db: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS search_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                report TEXT NOT NULL DEFAULT '',
                ai_answer TEXT NOT NULL DEFAULT '',
                ranking_result TEXT,
                layout_path TEXT,
                bar_chart_path TEXT,
                collection TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init search_history table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_search_history_query ON search_history(query, created_at)",
        )
        .execute(&pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create index: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn save(&self, record: &NewSearchRecord) -> Result<i64, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let ranking = serde_json::to_string(&record.ranking).map_err(ApiError::internal)?;

        let result = sqlx::query(
            "INSERT INTO search_history
                (query, report, ai_answer, ranking_result, layout_path, bar_chart_path, collection, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.query)
        .bind(&record.report)
        .bind(&record.ai_answer)
        .bind(ranking)
        .bind(&record.layout_path)
        .bind(&record.bar_chart_path)
        .bind(&record.collection)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to save search history: {}", e)))?;

        Ok(result.last_insert_rowid())
    }

    /// Newest first.
    pub async fn list(&self, limit: i64) -> Result<Vec<SearchRecord>, ApiError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let rows = sqlx::query("SELECT * FROM search_history ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(rows.iter().map(row_to_record).collect())
    }

    pub async fn latest_for_query(&self, query: &str) -> Result<Option<SearchRecord>, ApiError> {
        let row = sqlx::query(
            "SELECT * FROM search_history WHERE query = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(query)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(row.as_ref().map(row_to_record))
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> SearchRecord {
    let ranking = row
        .try_get::<Option<String>, _>("ranking_result")
        .unwrap_or(None)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();

    SearchRecord {
        id: row.try_get("id").unwrap_or_default(),
        query: row.try_get("query").unwrap_or_default(),
        report: row.try_get("report").unwrap_or_default(),
        ai_answer: row.try_get("ai_answer").unwrap_or_default(),
        ranking,
        layout_path: row.try_get("layout_path").unwrap_or(None),
        bar_chart_path: row.try_get("bar_chart_path").unwrap_or(None),
        collection: row.try_get("collection").unwrap_or(None),
        created_at: row.try_get("created_at").unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (tempfile::TempDir, SearchHistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SearchHistoryStore::new(dir.path().join("history.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn record(query: &str, answer: &str) -> NewSearchRecord {
        NewSearchRecord {
            query: query.to_string(),
            report: format!("report for {query}"),
            ai_answer: answer.to_string(),
            ranking: vec![RankingEntry {
                rank: 1,
                file_name: "a.txt".to_string(),
                file_location: "/d/a.txt".to_string(),
                relevance: 100.0,
                keywords: "k".to_string(),
                summary: "s".to_string(),
                content: "c".to_string(),
            }],
            layout_path: Some("search/q_3d_layout.json".to_string()),
            bar_chart_path: None,
            collection: Some("20240101_000000".to_string()),
        }
    }

    #[tokio::test]
    async fn save_and_list_newest_first() {
        let (_dir, store) = store().await;
        store.save(&record("first", "one")).await.unwrap();
        store.save(&record("second", "two")).await.unwrap();

        let listed = store.list(DEFAULT_HISTORY_LIMIT).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].query, "second");
        assert_eq!(listed[0].ranking[0].file_name, "a.txt");
        assert_eq!(listed[0].ranking[0].relevance, 100.0);
        assert_eq!(listed[1].bar_chart_path, None);

        assert_eq!(store.list(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn latest_for_query_picks_most_recent() {
        let (_dir, store) = store().await;
        store.save(&record("rust", "old")).await.unwrap();
        store.save(&record("rust", "new")).await.unwrap();
        store.save(&record("other", "x")).await.unwrap();

        let latest = store.latest_for_query("rust").await.unwrap().unwrap();
        assert_eq!(latest.ai_answer, "new");
        assert!(store.latest_for_query("missing").await.unwrap().is_none());
    }
}
