pub mod core;
pub mod documents;
pub mod graph;
pub mod history;
pub mod ingest;
pub mod llm;
pub mod rag;
pub mod search;
pub mod server;
pub mod state;
pub mod visual;
