//! Retrieval: chunking, vector storage, index building and relevance ranking.
//!
//! - `Chunker`: overlapping character windows over document text
//! - `VectorIndex` / `SqliteVectorIndex`: timestamped chunk collections
//! - `IndexBuilder`: embeds stored summaries into a new collection
//! - `RelevanceRanker`: dedup, normalization, ranking and enrichment of hits
//! - `RankedContextBuilder`: answer context from ranked results

pub mod builder;
pub mod context_builder;
pub mod engine;
pub mod ranker;
pub mod sqlite;
pub mod store;

pub use builder::IndexBuilder;
pub use context_builder::{ContextBuilderConfig, RankedContextBuilder};
pub use engine::{Chunker, ChunkerConfig, TextChunk};
pub use ranker::{
    DocumentMetadata, Lookup, MetadataLookup, RankingEntry, RawMatch, RelevanceRanker,
    ScoredResult,
};
pub use sqlite::SqliteVectorIndex;
pub use store::{CollectionInfo, StoredChunk, VectorIndex};
