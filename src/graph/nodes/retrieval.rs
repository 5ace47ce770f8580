// Retrieval Node
// Vector search plus relevance ranking of the hits

use async_trait::async_trait;

use crate::core::errors::ApiError;
use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::SearchState;
use crate::rag::ScoredResult;

pub struct RetrievalNode;

impl RetrievalNode {
    pub fn new() -> Self {
        Self
    }

    async fn retrieve(
        &self,
        state: &SearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<Vec<ScoredResult>, ApiError> {
        let embedding = ctx.llm.embed_one(&state.keywords).await?;
        let matches = ctx
            .index
            .search(&state.collection, &embedding, state.top_k)
            .await?;
        tracing::debug!(matches = matches.len(), collection = %state.collection, "Vector search done");

        Ok(ctx
            .ranker
            .rank_and_enrich(matches, state.top_k, ctx.lookup)
            .await)
    }
}

impl Default for RetrievalNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for RetrievalNode {
    fn id(&self) -> &'static str {
        "retrieval"
    }

    fn name(&self) -> &'static str {
        "Document Retrieval"
    }

    async fn execute(
        &self,
        state: &mut SearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        match self.retrieve(state, ctx).await {
            Ok(results) => {
                state.context = ctx.context_builder.build_context(&results);
                state.results = results;
            }
            Err(err) => {
                state.note_degraded(self.id(), err);
                state.results.clear();
                state.context.clear();
            }
        }
        Ok(NodeOutput::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::Fixture;
    use crate::rag::RawMatch;

    #[tokio::test]
    async fn ranks_hits_and_builds_context() {
        let fixture = Fixture::new().await;
        fixture.index.set_matches(vec![
            RawMatch::new("1", 0.1, "apples are red"),
            RawMatch::new("2", 0.5, "bananas are yellow"),
            RawMatch::new("1", 0.05, "apples are sweet"),
        ]);

        let mut state = SearchState::new("fruit", "c", 5);
        state.keywords = "fruit".into();
        RetrievalNode::new().execute(&mut state, &fixture.ctx()).await.unwrap();

        assert_eq!(state.results.len(), 2);
        assert_eq!(state.results[0].document_id, "1");
        assert_eq!(state.results[0].relevance, 100.0);
        assert_eq!(state.results[1].relevance, 2.0);
        assert_eq!(state.context, "apples are sweet\n\nbananas are yellow");
    }

    #[tokio::test]
    async fn search_failure_yields_empty_results() {
        let fixture = Fixture::new().await;
        fixture.index.set_failing(true);

        let mut state = SearchState::new("fruit", "c", 5);
        state.keywords = "fruit".into();
        RetrievalNode::new().execute(&mut state, &fixture.ctx()).await.unwrap();

        assert!(state.results.is_empty());
        assert!(state.context.is_empty());
        assert_eq!(state.degraded.len(), 1);
    }
}
