// Graph Runtime - petgraph based
// Type-safe StateGraph execution engine

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;

use super::node::{GraphError, Node, NodeContext, NodeOutput};
use super::state::SearchState;

/// petgraph-based StateGraph runtime
pub struct GraphRuntime {
    /// The underlying directed graph
    graph: DiGraph<Box<dyn Node>, ()>,
    /// Map from node ID to NodeIndex for lookup
    node_indices: HashMap<String, NodeIndex>,
    /// Entry point node ID
    entry_node_id: String,
    /// Maximum execution steps (recursion limit)
    max_steps: usize,
}

impl GraphRuntime {
    /// Create a new graph runtime
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            entry_node_id: String::new(),
            max_steps: 16,
        }
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, node: Box<dyn Node>) -> NodeIndex {
        let id = node.id().to_string();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id, index);
        index
    }

    /// Add an edge between two nodes
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let from_idx = self
            .node_indices
            .get(from)
            .ok_or_else(|| GraphError::new(from, format!("Source node not found: {}", from)))?;
        let to_idx = self
            .node_indices
            .get(to)
            .ok_or_else(|| GraphError::new(to, format!("Target node not found: {}", to)))?;

        self.graph.add_edge(*from_idx, *to_idx, ());
        Ok(())
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> Vec<&str> {
        self.node_indices.keys().map(|s| s.as_str()).collect()
    }

    /// Check for cycles in the graph (for debugging)
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }

    /// Execute the graph from the entry node until a node returns `Final`.
    ///
    /// Failures carry the IDs of the nodes visited before them.
    pub async fn run(
        &self,
        state: &mut SearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<(), GraphError> {
        if self.entry_node_id.is_empty() {
            return Err(GraphError::new("runtime", "No entry node set"));
        }

        let mut current_idx = *self.node_indices.get(&self.entry_node_id).ok_or_else(|| {
            GraphError::new(
                "runtime",
                format!("Entry node not found: {}", self.entry_node_id),
            )
        })?;

        let mut trace: Vec<String> = Vec::new();

        for step in 0..self.max_steps {
            let node = self
                .graph
                .node_weight(current_idx)
                .ok_or_else(|| GraphError::new("runtime", "Node not found in graph"))?;

            let node_id = node.id();
            tracing::debug!("Executing node: {} (step {})", node_id, step);

            let output = match node.execute(state, ctx).await {
                Ok(output) => output,
                Err(err) => return Err(err.with_trace(trace)),
            };
            let next = match output {
                NodeOutput::Final => {
                    tracing::debug!("Graph execution complete at node: {}", node_id);
                    return Ok(());
                }
                NodeOutput::Error(msg) => {
                    return Err(GraphError::new(node_id, msg).with_trace(trace));
                }
                NodeOutput::Continue => self.next_node(current_idx),
            };

            trace.push(node_id.to_string());
            current_idx = match next {
                Ok(idx) => idx,
                Err(err) => return Err(err.with_trace(trace)),
            };
        }

        Err(GraphError::new(
            "runtime",
            format!("Maximum steps ({}) exceeded", self.max_steps),
        )
        .with_trace(trace))
    }

    /// The single successor of a node. Fan-out is rejected.
    fn next_node(&self, current_idx: NodeIndex) -> Result<NodeIndex, GraphError> {
        let current_id = self
            .graph
            .node_weight(current_idx)
            .map(|n| n.id())
            .unwrap_or("unknown");

        let mut targets = self
            .graph
            .neighbors_directed(current_idx, Direction::Outgoing);
        match (targets.next(), targets.next()) {
            (Some(target), None) => Ok(target),
            (None, _) => Err(GraphError::new(
                current_id,
                format!("No outgoing edges from node: {}", current_id),
            )),
            (Some(_), Some(_)) => Err(GraphError::new(
                current_id,
                format!("Node has more than one outgoing edge: {}", current_id),
            )),
        }
    }
}

impl Default for GraphRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing graphs fluently
pub struct GraphBuilder {
    runtime: GraphRuntime,
    pending_edges: Vec<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            runtime: GraphRuntime::new(),
            pending_edges: Vec::new(),
        }
    }

    pub fn entry(mut self, node_id: impl Into<String>) -> Self {
        self.runtime.entry_node_id = node_id.into();
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.runtime.max_steps = max_steps;
        self
    }

    pub fn node(mut self, node: Box<dyn Node>) -> Self {
        self.runtime.add_node(node);
        self
    }

    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.pending_edges.push((from.into(), to.into()));
        self
    }

    pub fn build(mut self) -> Result<GraphRuntime, GraphError> {
        for (from, to) in self.pending_edges {
            self.runtime.add_edge(&from, &to)?;
        }
        Ok(self.runtime)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::Fixture;
    use async_trait::async_trait;

    struct Step {
        id: &'static str,
        output: NodeOutput,
    }

    #[async_trait]
    impl Node for Step {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn execute(
            &self,
            state: &mut SearchState,
            _ctx: &NodeContext<'_>,
        ) -> Result<NodeOutput, GraphError> {
            state.degraded.push(self.id.to_string());
            Ok(self.output.clone())
        }
    }

    fn step(id: &'static str, output: NodeOutput) -> Box<dyn Node> {
        Box::new(Step { id, output })
    }

    #[tokio::test]
    async fn runs_linear_graph_to_final() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .node(step("b", NodeOutput::Continue))
            .node(step("c", NodeOutput::Final))
            .edge("a", "b")
            .edge("b", "c")
            .build()
            .unwrap();

        let mut state = SearchState::default();
        graph.run(&mut state, &fixture.ctx()).await.unwrap();
        assert_eq!(state.degraded, vec!["a", "b", "c"]);
        assert!(!graph.has_cycle());
    }

    #[tokio::test]
    async fn error_output_reports_trace() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .node(step("b", NodeOutput::Error("broken".into())))
            .edge("a", "b")
            .build()
            .unwrap();

        let err = graph
            .run(&mut SearchState::default(), &fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.node_id, "b");
        assert_eq!(err.execution_trace, vec!["a"]);
    }

    #[tokio::test]
    async fn cycles_stop_at_max_steps() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("loop")
            .max_steps(3)
            .node(step("loop", NodeOutput::Continue))
            .edge("loop", "loop")
            .build()
            .unwrap();

        let mut state = SearchState::default();
        let err = graph.run(&mut state, &fixture.ctx()).await.unwrap_err();
        assert!(err.message.contains("Maximum steps (3)"));
        assert_eq!(state.degraded.len(), 3);
    }

    #[tokio::test]
    async fn fan_out_is_rejected() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .node(step("b", NodeOutput::Final))
            .node(step("c", NodeOutput::Final))
            .edge("a", "b")
            .edge("a", "c")
            .build()
            .unwrap();

        let err = graph
            .run(&mut SearchState::default(), &fixture.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.node_id, "a");
        assert!(err.message.contains("more than one outgoing edge"));
    }

    #[tokio::test]
    async fn dead_end_reports_missing_edge() {
        let fixture = Fixture::new().await;
        let graph = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Continue))
            .build()
            .unwrap();

        let err = graph
            .run(&mut SearchState::default(), &fixture.ctx())
            .await
            .unwrap_err();
        assert!(err.message.contains("No outgoing edges"));
    }

    #[test]
    fn edges_to_unknown_nodes_fail_build() {
        let result = GraphBuilder::new()
            .entry("a")
            .node(step("a", NodeOutput::Final))
            .edge("a", "missing")
            .build();
        assert!(result.is_err());
    }
}
