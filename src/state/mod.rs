use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings};
use crate::documents::DocumentStore;
use crate::history::SearchHistoryStore;
use crate::ingest::IngestService;
use crate::llm::{LlmProvider, LlmService, OllamaProvider};
use crate::rag::{ChunkerConfig, IndexBuilder, SqliteVectorIndex, VectorIndex};
use crate::search::SearchService;
use crate::visual::LayoutExporter;

pub mod error;

use error::InitializationError;

/// Global application state shared across all routes.
///
/// Settings are read once here and handed to each service; nothing below
/// reaches back into a global.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub llm: LlmService,
    pub documents: DocumentStore,
    pub index: Arc<dyn VectorIndex>,
    pub history: SearchHistoryStore,
    pub ingest: IngestService,
    pub index_builder: Arc<IndexBuilder>,
    pub search: Arc<SearchService>,
}

impl AppState {
    /// Initializes the application state against the configured Ollama server.
    ///
    /// This process includes:
    /// 1. Discovering paths and loading configuration
    /// 2. Opening the document, history and vector index databases
    /// 3. Building the search graph
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let settings = ConfigService::new(paths.clone()).settings();

        reqwest::Url::parse(&settings.llm.base_url)
            .map_err(|e| InitializationError::Llm(e.into()))?;
        let provider = Arc::new(OllamaProvider::new(
            settings.llm.base_url.clone(),
            settings.llm.api_key.clone(),
        ));

        Self::with_provider(paths, provider).await
    }

    /// Same as [`AppState::initialize`] but with an explicit LLM provider.
    pub async fn with_provider(
        paths: Arc<AppPaths>,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone());
        let settings = config.settings();

        let llm = LlmService::new(provider, settings.llm.clone());

        let documents = DocumentStore::new(paths.db_path.clone())
            .await
            .map_err(|e| InitializationError::Documents(e.into()))?;

        let history = SearchHistoryStore::new(paths.db_path.clone())
            .await
            .map_err(|e| InitializationError::History(e.into()))?;

        let index: Arc<dyn VectorIndex> = Arc::new(
            SqliteVectorIndex::new(paths.as_ref())
                .await
                .map_err(|e| InitializationError::VectorIndex(e.into()))?,
        );

        let ingest = IngestService::new(llm.clone(), documents.clone(), settings.ingest.clone());

        let index_builder = Arc::new(IndexBuilder::new(
            documents.clone(),
            index.clone(),
            llm.clone(),
            ChunkerConfig {
                chunk_size: settings.ingest.chunk_size,
                chunk_overlap: settings.ingest.chunk_overlap,
            },
        ));

        let search = Arc::new(
            SearchService::new(
                llm.clone(),
                index.clone(),
                documents.clone(),
                history.clone(),
                LayoutExporter::new(paths.export_dir.clone()),
                settings.search.clone(),
            )
            .map_err(|e| InitializationError::Graph(e.into()))?,
        );

        tracing::info!(
            provider = llm.provider_name(),
            db = %paths.db_path.display(),
            "Application state initialized"
        );

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            llm,
            documents,
            index,
            history,
            ingest,
            index_builder,
            search,
        }))
    }
}
