//! Search orchestration: plain vector search and the full AI search run.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;

use crate::core::config::SearchSettings;
use crate::core::errors::ApiError;
use crate::documents::DocumentStore;
use crate::graph::{build_search_graph, extract_answer, GraphRuntime, NodeContext, SearchState};
use crate::history::{NewSearchRecord, SearchHistoryStore};
use crate::llm::LlmService;
use crate::rag::store::collection_name_at;
use crate::rag::{
    ContextBuilderConfig, RankedContextBuilder, RankingEntry, RelevanceRanker, ScoredResult,
    VectorIndex,
};
use crate::visual::{bar_chart, layout_3d, BarChart, Layout3d, LayoutExporter};

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub collection: String,
    pub results: Vec<ScoredResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiSearchResponse {
    pub query: String,
    pub collection: String,
    pub keywords: String,
    pub results: Vec<ScoredResult>,
    pub answer: String,
    pub report: String,
    pub layout: Layout3d,
    pub bar_chart: BarChart,
    pub layout_path: Option<String>,
    pub bar_chart_path: Option<String>,
    pub history_id: Option<i64>,
    pub degraded: Vec<String>,
}

pub struct SearchService {
    llm: LlmService,
    index: Arc<dyn VectorIndex>,
    documents: DocumentStore,
    history: SearchHistoryStore,
    exporter: LayoutExporter,
    graph: GraphRuntime,
    ranker: RelevanceRanker,
    context_builder: RankedContextBuilder,
    settings: SearchSettings,
}

fn require_query(query: &str) -> Result<&str, ApiError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }
    Ok(trimmed)
}

impl SearchService {
    pub fn new(
        llm: LlmService,
        index: Arc<dyn VectorIndex>,
        documents: DocumentStore,
        history: SearchHistoryStore,
        exporter: LayoutExporter,
        settings: SearchSettings,
    ) -> Result<Self, ApiError> {
        let graph = build_search_graph()?;
        Ok(Self {
            ranker: RelevanceRanker::new(
                settings.summary_preview_chars,
                Duration::from_millis(settings.lookup_timeout_ms),
            ),
            context_builder: RankedContextBuilder::new(ContextBuilderConfig {
                context_documents: settings.context_documents,
            }),
            llm,
            index,
            documents,
            history,
            exporter,
            graph,
            settings,
        })
    }

    async fn ensure_llm(&self) -> Result<(), ApiError> {
        if !self.llm.is_available().await {
            return Err(ApiError::ServiceUnavailable(format!(
                "LLM provider '{}' is not reachable",
                self.llm.provider_name()
            )));
        }
        Ok(())
    }

    /// The requested collection, or the latest one when none is given.
    pub async fn resolve_collection(&self, requested: Option<&str>) -> Result<String, ApiError> {
        match requested.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => {
                let known = self.index.list_collections().await?;
                if known.iter().any(|c| c.name == name) {
                    Ok(name.to_string())
                } else {
                    Err(ApiError::NotFound(format!("Collection not found: {}", name)))
                }
            }
            None => self.index.latest_collection().await?.ok_or_else(|| {
                ApiError::NotFound("No index has been built yet".to_string())
            }),
        }
    }

    /// Embeds the query as-is and returns ranked, enriched results.
    pub async fn vector_search(
        &self,
        query: &str,
        collection: Option<&str>,
        top_k: usize,
    ) -> Result<SearchResponse, ApiError> {
        let query = require_query(query)?;
        if top_k == 0 {
            return Err(ApiError::BadRequest("top_k must be at least 1".to_string()));
        }
        self.ensure_llm().await?;
        let collection = self.resolve_collection(collection).await?;

        let embedding = self.llm.embed_one(query).await?;
        let matches = self.index.search(&collection, &embedding, top_k).await?;
        let results = self
            .ranker
            .rank_and_enrich(matches, top_k, &self.documents)
            .await;

        tracing::info!(collection = %collection, results = results.len(), "Vector search");
        Ok(SearchResponse {
            query: query.to_string(),
            collection,
            results,
        })
    }

    /// Runs the search pipeline, exports the layout and records history.
    ///
    /// Export and history failures are logged; they never fail the search.
    pub async fn ai_search(
        &self,
        query: &str,
        collection: Option<&str>,
    ) -> Result<AiSearchResponse, ApiError> {
        let query = require_query(query)?;
        self.ensure_llm().await?;
        let collection = self.resolve_collection(collection).await?;

        let mut state = SearchState::new(query, collection.clone(), self.settings.top_k.max(1));
        let ctx = NodeContext {
            llm: &self.llm,
            index: self.index.as_ref(),
            lookup: &self.documents,
            ranker: &self.ranker,
            context_builder: &self.context_builder,
        };
        self.graph.run(&mut state, &ctx).await?;

        let layout = layout_3d(query, &state.results);
        let chart = bar_chart(&state.results);
        let timestamp = collection_name_at(Local::now());

        let exported = match self.exporter.export(query, &timestamp, &layout, &chart).await {
            Ok(paths) => Some(paths),
            Err(err) => {
                tracing::warn!("Layout export failed: {}", err);
                None
            }
        };
        let layout_path = exported
            .as_ref()
            .map(|p| p.layout_path.to_string_lossy().to_string());
        let bar_chart_path = exported
            .as_ref()
            .map(|p| p.bar_chart_path.to_string_lossy().to_string());

        let record = NewSearchRecord {
            query: query.to_string(),
            report: state.report.clone(),
            ai_answer: extract_answer(&state.report),
            ranking: state.results.iter().map(RankingEntry::from).collect(),
            layout_path: layout_path.clone(),
            bar_chart_path: bar_chart_path.clone(),
            collection: Some(collection.clone()),
        };
        let history_id = match self.history.save(&record).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!("Search history write failed: {}", err);
                None
            }
        };

        tracing::info!(
            collection = %collection,
            results = state.results.len(),
            degraded = state.degraded.len(),
            "AI search finished"
        );

        Ok(AiSearchResponse {
            query: query.to_string(),
            collection,
            keywords: state.keywords,
            results: state.results,
            answer: state.answer,
            report: state.report,
            layout,
            bar_chart: chart,
            layout_path,
            bar_chart_path,
            history_id,
            degraded: state.degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LlmSettings;
    use crate::documents::NewDocument;
    use crate::llm::MockProvider;
    use crate::rag::{ChunkerConfig, IndexBuilder, SqliteVectorIndex};

    struct Harness {
        _dir: tempfile::TempDir,
        mock: MockProvider,
        service: SearchService,
        history: SearchHistoryStore,
        builder: IndexBuilder,
        documents: DocumentStore,
    }

    async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockProvider::new();
        let llm = LlmService::new(Arc::new(mock.clone()), LlmSettings::default());
        let documents = DocumentStore::new(dir.path().join("docs.db")).await.unwrap();
        let history = SearchHistoryStore::new(dir.path().join("docs.db")).await.unwrap();
        let index: Arc<dyn VectorIndex> = Arc::new(
            SqliteVectorIndex::with_path(dir.path().join("index.db"))
                .await
                .unwrap(),
        );
        let builder = IndexBuilder::new(
            documents.clone(),
            index.clone(),
            llm.clone(),
            ChunkerConfig::default(),
        );
        let service = SearchService::new(
            llm,
            index,
            documents.clone(),
            history.clone(),
            LayoutExporter::new(dir.path().join("search")),
            SearchSettings::default(),
        )
        .unwrap();

        Harness {
            _dir: dir,
            mock,
            service,
            history,
            builder,
            documents,
        }
    }

    async fn add(h: &Harness, name: &str, title: &str, summary: &str) {
        h.documents
            .insert_document(&NewDocument {
                title: title.to_string(),
                summary: summary.to_string(),
                keywords: "k".to_string(),
                file_location: format!("/d/{name}"),
                file_name: name.to_string(),
                doc_type: ".txt".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let h = harness().await;
        assert!(matches!(
            h.service.vector_search("   ", None, 5).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            h.service.ai_search("", None).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn zero_top_k_is_rejected() {
        let h = harness().await;
        add(&h, "apple.txt", "apple", "apple apple").await;
        add(&h, "zebra.txt", "zebra", "zebra zebra").await;
        h.builder.build().await.unwrap();

        assert!(matches!(
            h.service.vector_search("apple", None, 0).await,
            Err(ApiError::BadRequest(_))
        ));
        let one = h.service.vector_search("apple", None, 1).await.unwrap();
        assert_eq!(one.results.len(), 1);
    }

    #[tokio::test]
    async fn offline_llm_is_unavailable() {
        let h = harness().await;
        h.mock.set_offline(true);
        assert!(matches!(
            h.service.vector_search("apples", None, 5).await,
            Err(ApiError::ServiceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn missing_index_is_not_found() {
        let h = harness().await;
        assert!(matches!(
            h.service.vector_search("apples", None, 5).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            h.service.resolve_collection(Some("19990101_000000")).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn vector_search_ranks_enriched_documents() {
        let h = harness().await;
        add(&h, "apple.txt", "apple", "apple apple").await;
        add(&h, "zebra.txt", "zebra", "zebra zebra").await;
        let collection = h.builder.build().await.unwrap();

        let response = h.service.vector_search("apple", None, 5).await.unwrap();
        assert_eq!(response.collection, collection.name);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].file_name, "apple.txt");
        assert_eq!(response.results[0].relevance, 100.0);
        assert_eq!(response.results[0].file_location, "/d/apple.txt");
        assert_eq!(response.results[1].relevance, 2.0);
    }

    #[tokio::test]
    async fn ai_search_exports_layout_and_records_history() {
        let h = harness().await;
        add(&h, "apple.txt", "apple", "apple apple").await;
        add(&h, "zebra.txt", "zebra", "zebra zebra").await;
        h.builder.build().await.unwrap();
        h.mock.reply_when("Question:", "apple");
        h.mock.reply_when("### User question", "apple.txt\n==Conclusion==\napple.txt");

        let response = h.service.ai_search("which apple?", None).await.unwrap();

        assert_eq!(response.keywords, "apple");
        assert_eq!(response.results[0].file_name, "apple.txt");
        assert_eq!(response.layout.nodes.len(), 2);
        assert!(response.report.contains("--- #1 (100.0%) ---"));
        let layout_path = response.layout_path.clone().unwrap();
        assert!(std::path::Path::new(&layout_path).exists());
        assert!(layout_path.contains("which_apple_3d_layout_"));

        let saved = h.history.latest_for_query("which apple?").await.unwrap().unwrap();
        assert_eq!(Some(saved.id), response.history_id);
        assert_eq!(saved.ai_answer, "apple.txt\n==Conclusion==\napple.txt");
        assert_eq!(saved.ranking.len(), 2);
        assert_eq!(saved.ranking[0].rank, 1);
    }
}
