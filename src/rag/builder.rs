//! Builds a new vector collection from the stored document summaries.

use std::sync::Arc;

use chrono::Local;

use super::engine::{Chunker, ChunkerConfig};
use super::store::{collection_name_at, CollectionInfo, StoredChunk, VectorIndex};
use crate::core::errors::ApiError;
use crate::documents::{DocumentStore, IndexSource};
use crate::llm::LlmService;

const EMBED_BATCH_SIZE: usize = 32;

/// Text embedded for a document: `"{title}. {summary}"`, or whichever part exists.
pub fn index_text(source: &IndexSource) -> Option<String> {
    let title = source.title.trim();
    let summary = source.summary.trim();
    match (title.is_empty(), summary.is_empty()) {
        (true, true) => None,
        (false, true) => Some(title.to_string()),
        (true, false) => Some(summary.to_string()),
        (false, false) => Some(format!("{}. {}", title, summary)),
    }
}

pub struct IndexBuilder {
    documents: DocumentStore,
    index: Arc<dyn VectorIndex>,
    llm: LlmService,
    chunker: Chunker,
}

impl IndexBuilder {
    pub fn new(
        documents: DocumentStore,
        index: Arc<dyn VectorIndex>,
        llm: LlmService,
        chunker_config: ChunkerConfig,
    ) -> Self {
        Self {
            documents,
            index,
            llm,
            chunker: Chunker::new(chunker_config),
        }
    }

    pub async fn build(&self) -> Result<CollectionInfo, ApiError> {
        let sources = self.documents.load_index_sources().await?;

        let mut chunks = Vec::new();
        let mut document_count = 0;
        for source in &sources {
            let Some(text) = index_text(source) else {
                tracing::debug!(document_id = source.id, "Skipping document with no text");
                continue;
            };
            document_count += 1;
            for piece in self.chunker.split(&text) {
                chunks.push(StoredChunk {
                    chunk_id: String::new(),
                    document_id: source.id.to_string(),
                    content: piece.text,
                    chunk_index: piece.chunk_index,
                    start_offset: piece.start_offset,
                });
            }
        }

        if chunks.is_empty() {
            return Err(ApiError::BadRequest(
                "No documents with text to index".to_string(),
            ));
        }

        let now = Local::now();
        let info = CollectionInfo {
            name: collection_name_at(now),
            document_count,
            chunk_count: 0,
            embedding_model: self.llm.embedding_model().to_string(),
            created_at: now.to_rfc3339(),
        };
        for chunk in &mut chunks {
            chunk.chunk_id = format!("{}-{}-{}", info.name, chunk.document_id, chunk.chunk_index);
        }

        self.index.create_collection(&info).await?;
        if let Err(err) = self.fill(&info.name, chunks).await {
            tracing::error!(collection = %info.name, "Index build failed: {}", err);
            if let Err(cleanup) = self.index.delete_collection(&info.name).await {
                tracing::warn!(collection = %info.name, "Failed to remove partial collection: {}", cleanup);
            }
            return Err(err);
        }

        let built = self
            .index
            .list_collections()
            .await?
            .into_iter()
            .find(|c| c.name == info.name)
            .unwrap_or(info);

        tracing::info!(
            collection = %built.name,
            documents = built.document_count,
            chunks = built.chunk_count,
            "Index built"
        );
        Ok(built)
    }

    async fn fill(&self, collection: &str, chunks: Vec<StoredChunk>) -> Result<(), ApiError> {
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let inputs: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.llm.embed(&inputs).await?;
            if embeddings.len() != batch.len() {
                return Err(ApiError::Upstream(format!(
                    "Embedding count mismatch: {} != {}",
                    embeddings.len(),
                    batch.len()
                )));
            }
            let items = batch.iter().cloned().zip(embeddings).collect();
            self.index.insert_batch(collection, items).await?;
        }
        Ok(())
    }
}
