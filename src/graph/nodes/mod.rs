// Graph Nodes
// One node per search pipeline step

pub mod answer;
pub mod extractor;
pub mod formatter;
pub mod retrieval;

pub use answer::AnswerNode;
pub use extractor::ExtractorNode;
pub use formatter::{extract_answer, format_report, FormatterNode};
pub use retrieval::RetrievalNode;
