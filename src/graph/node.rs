// Node trait and types
// Base abstraction for graph nodes

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::llm::LlmService;
use crate::rag::{MetadataLookup, RankedContextBuilder, RelevanceRanker, VectorIndex};

use super::state::SearchState;

/// Collaborators available to nodes during execution
pub struct NodeContext<'a> {
    pub llm: &'a LlmService,
    pub index: &'a dyn VectorIndex,
    pub lookup: &'a dyn MetadataLookup,
    pub ranker: &'a RelevanceRanker,
    pub context_builder: &'a RankedContextBuilder,
}

/// Output from a node execution
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// Continue along the node's outgoing edge
    Continue,
    /// Graph execution complete
    Final,
    /// Error occurred
    Error(String),
}

/// Graph execution error
///
/// `execution_trace` holds the node IDs visited before the failure, most-recent last.
#[derive(Debug, Clone)]
pub struct GraphError {
    pub node_id: String,
    pub message: String,
    pub execution_trace: Vec<String>,
}

impl GraphError {
    pub fn new(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            message: message.into(),
            execution_trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.execution_trace = trace;
        self
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.execution_trace.is_empty() {
            write!(f, "Graph error in {}: {}", self.node_id, self.message)
        } else {
            write!(
                f,
                "Graph error in {} (trace: {}): {}",
                self.node_id,
                self.execution_trace.join(" -> "),
                self.message
            )
        }
    }
}

impl std::error::Error for GraphError {}

/// Node trait - all graph nodes implement this
#[async_trait]
pub trait Node: Send + Sync {
    /// Unique identifier for this node
    fn id(&self) -> &'static str;

    /// Human-readable name for display
    fn name(&self) -> &'static str {
        self.id()
    }

    async fn execute(
        &self,
        state: &mut SearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError>;
}
