//! Document ingestion: load a file, summarize it with the keyword model,
//! and store the summary row.

pub mod loader;
pub mod summary;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::IngestSettings;
use crate::core::errors::ApiError;
use crate::documents::{DocumentStore, InsertOutcome, NewDocument};
use crate::llm::LlmService;
use crate::rag::engine::{Chunker, ChunkerConfig};

pub use loader::{doc_type, load_text};
pub use summary::{parse_summary, summary_prompt, ParsedSummary};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Inserted {
        id: i64,
        file_name: String,
        doc_type: String,
        title: String,
    },
    Duplicate {
        file_name: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub file_name: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderReport {
    pub total: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: Vec<FailedFile>,
    /// File count per `doc_type`.
    pub by_type: BTreeMap<String, usize>,
}

#[derive(Clone)]
pub struct IngestService {
    llm: LlmService,
    documents: DocumentStore,
    settings: IngestSettings,
}

impl IngestService {
    pub fn new(llm: LlmService, documents: DocumentStore, settings: IngestSettings) -> Self {
        Self {
            llm,
            documents,
            settings,
        }
    }

    /// Text sent for summarization: the first source chunks, capped in length.
    fn summary_input(&self, text: &str) -> String {
        let sources = self.settings.max_source_chunks.max(1);
        let chunker = Chunker::new(ChunkerConfig {
            chunk_size: (self.settings.max_input_chars / sources).max(1),
            chunk_overlap: 0,
        });

        let joined = chunker
            .split(text)
            .into_iter()
            .take(sources)
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\n\n");

        joined.chars().take(self.settings.max_input_chars).collect()
    }

    pub async fn summarize(&self, text: &str) -> Result<ParsedSummary, ApiError> {
        let prompt = summary_prompt(&self.summary_input(text), self.settings.max_summary_chars);
        let reply = self.llm.generate(&prompt).await?;
        Ok(parse_summary(&reply, self.settings.max_summary_chars))
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestOutcome, ApiError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ApiError::BadRequest(format!("Not a file path: {}", path.display())))?;

        if self.documents.exists_by_file_name(&file_name).await? {
            tracing::info!(file_name = %file_name, "Skipping already ingested document");
            return Ok(IngestOutcome::Duplicate { file_name });
        }

        let text = load_text(path).await?;
        let parsed = self.summarize(&text).await?;
        let doc_type = doc_type(&file_name);

        let record = NewDocument {
            title: parsed.title.clone(),
            summary: parsed.summary,
            keywords: parsed.keywords,
            file_location: path.to_string_lossy().to_string(),
            file_name: file_name.clone(),
            doc_type: doc_type.clone(),
        };

        match self.documents.insert_document(&record).await? {
            InsertOutcome::Inserted(id) => {
                tracing::info!(id, file_name = %file_name, doc_type = %doc_type, "Document ingested");
                Ok(IngestOutcome::Inserted {
                    id,
                    file_name,
                    doc_type,
                    title: parsed.title,
                })
            }
            InsertOutcome::Duplicate => Ok(IngestOutcome::Duplicate { file_name }),
        }
    }

    /// Ingests every regular file directly inside `folder`.
    ///
    /// Per-file failures are collected in the report.
    pub async fn ingest_folder(&self, folder: &Path) -> Result<FolderReport, ApiError> {
        let files = list_files(folder).await?;
        let mut report = FolderReport {
            total: files.len(),
            ..FolderReport::default()
        };

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            *report.by_type.entry(doc_type(&file_name)).or_insert(0) += 1;

            match self.ingest_file(&path).await {
                Ok(IngestOutcome::Inserted { .. }) => report.inserted += 1,
                Ok(IngestOutcome::Duplicate { .. }) => report.duplicates += 1,
                Err(err) => {
                    tracing::warn!(file_name = %file_name, "Ingest failed: {}", err);
                    report.failed.push(FailedFile {
                        file_name,
                        error: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            folder = %folder.display(),
            total = report.total,
            inserted = report.inserted,
            duplicates = report.duplicates,
            failed = report.failed.len(),
            "Folder ingest finished"
        );
        Ok(report)
    }
}

async fn list_files(folder: &Path) -> Result<Vec<PathBuf>, ApiError> {
    let mut entries = tokio::fs::read_dir(folder).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(format!("Folder not found: {}", folder.display()))
        } else {
            ApiError::BadRequest(format!("Cannot read folder {}: {}", folder.display(), e))
        }
    })?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(ApiError::internal)? {
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LlmSettings;
    use crate::llm::MockProvider;
    use std::sync::Arc;

    async fn service(mock: MockProvider, dir: &Path) -> IngestService {
        let documents = DocumentStore::new(dir.join("docs.db")).await.unwrap();
        let llm = LlmService::new(Arc::new(mock), LlmSettings::default());
        IngestService::new(llm, documents, IngestSettings::default())
    }

    #[tokio::test]
    async fn ingest_file_stores_parsed_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockProvider::new();
        mock.push_reply("title: Garden notes\nsummary: Tomatoes need sun.\nkeywords: garden, tomato");
        let svc = service(mock.clone(), dir.path()).await;

        let file = dir.path().join("Garden.TXT");
        std::fs::write(&file, "Tomatoes grow best in full sun.").unwrap();

        let outcome = svc.ingest_file(&file).await.unwrap();
        let IngestOutcome::Inserted { id, doc_type, title, .. } = outcome else {
            panic!("expected insert");
        };
        assert_eq!(doc_type, ".txt");
        assert_eq!(title, "Garden notes");

        let stored = svc.documents.get_document(id).await.unwrap().unwrap();
        assert_eq!(stored.summary, "Tomatoes need sun.");
        assert_eq!(stored.keywords, "garden, tomato");
        assert!(mock.prompts()[0].contains("Tomatoes grow best"));

        let again = svc.ingest_file(&file).await.unwrap();
        assert!(matches!(again, IngestOutcome::Duplicate { .. }));
        assert_eq!(mock.prompts().len(), 1);
    }

    #[tokio::test]
    async fn folder_ingest_collects_failures_without_aborting() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), "alpha").unwrap();
        std::fs::write(docs.join("b.md"), "beta").unwrap();
        std::fs::write(docs.join("c.pdf"), "%PDF").unwrap();
        std::fs::create_dir(docs.join("nested")).unwrap();

        let svc = service(MockProvider::new(), dir.path()).await;
        let report = svc.ingest_folder(&docs).await.unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file_name, "c.pdf");
        assert_eq!(report.by_type.get(".md"), Some(&1));

        let rerun = svc.ingest_folder(&docs).await.unwrap();
        assert_eq!(rerun.duplicates, 2);
    }

    #[tokio::test]
    async fn llm_failure_fails_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockProvider::new();
        mock.set_failing(true);
        let svc = service(mock, dir.path()).await;

        let file = dir.path().join("x.txt");
        std::fs::write(&file, "content").unwrap();
        assert!(matches!(svc.ingest_file(&file).await, Err(ApiError::Upstream(_))));
        assert_eq!(svc.documents.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_folder_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(MockProvider::new(), dir.path()).await;
        assert!(matches!(
            svc.ingest_folder(&dir.path().join("nope")).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn summary_input_takes_leading_chunks_within_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = service(MockProvider::new(), dir.path()).await;
        svc.settings = IngestSettings {
            max_input_chars: 100,
            max_source_chunks: 2,
            ..IngestSettings::default()
        };

        let input = svc.summary_input(&"x".repeat(1000));
        assert_eq!(input.chars().count(), 100);
        assert_eq!(svc.summary_input("short text"), "short text");
    }
}
