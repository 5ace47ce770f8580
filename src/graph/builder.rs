// Graph Builder
// Constructs the search pipeline graph using petgraph

use super::node::GraphError;
use super::nodes::{AnswerNode, ExtractorNode, FormatterNode, RetrievalNode};
use super::runtime::{GraphBuilder, GraphRuntime};

/// extractor -> retrieval -> answer -> formatter
pub fn build_search_graph() -> Result<GraphRuntime, GraphError> {
    GraphBuilder::new()
        .entry("extractor")
        .max_steps(8)
        .node(Box::new(ExtractorNode::new()))
        .node(Box::new(RetrievalNode::new()))
        .node(Box::new(AnswerNode::new()))
        .node(Box::new(FormatterNode::new()))
        .edge("extractor", "retrieval")
        .edge("retrieval", "answer")
        .edge("answer", "formatter")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::state::SearchState;
    use crate::graph::test_support::Fixture;
    use crate::rag::RawMatch;

    #[test]
    fn search_graph_is_acyclic_with_four_nodes() {
        let graph = build_search_graph().unwrap();
        let mut ids = graph.node_ids();
        ids.sort();
        assert_eq!(ids, vec!["answer", "extractor", "formatter", "retrieval"]);
        assert!(!graph.has_cycle());
    }

    #[tokio::test]
    async fn full_pipeline_produces_report() {
        let fixture = Fixture::new().await;
        fixture.mock.reply_when("Question:", "apples");
        fixture.mock.reply_when("### User question", "a.txt\n==Conclusion==\na.txt - apples");
        fixture.index.set_matches(vec![
            RawMatch::new("1", 0.2, "apples are red"),
            RawMatch::new("2", 0.6, "bananas are yellow"),
        ]);

        let mut state = SearchState::new("red fruit", "c", 5);
        build_search_graph()
            .unwrap()
            .run(&mut state, &fixture.ctx())
            .await
            .unwrap();

        assert_eq!(state.keywords, "apples");
        assert_eq!(state.results.len(), 2);
        assert!(state.report.contains("--- #1 (100.0%) ---"));
        assert!(state.report.ends_with("a.txt - apples"));
        assert!(state.degraded.is_empty());
    }

    #[tokio::test]
    async fn pipeline_survives_a_dead_model() {
        let fixture = Fixture::new().await;
        fixture.mock.set_failing(true);

        let mut state = SearchState::new("red fruit", "c", 5);
        build_search_graph()
            .unwrap()
            .run(&mut state, &fixture.ctx())
            .await
            .unwrap();

        assert_eq!(state.keywords, "red fruit");
        assert!(state.results.is_empty());
        assert!(state.report.ends_with("No relevant information was found."));
        assert_eq!(state.degraded.len(), 2);
    }
}
