// Extractor Node
// Turns the user query into comma-separated search keywords

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::SearchState;

pub struct ExtractorNode;

impl ExtractorNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractorNode {
    fn default() -> Self {
        Self::new()
    }
}

pub fn keyword_prompt(query: &str) -> String {
    format!(
        "Check the word spacing of the user's question and output the keywords to search for, \
         separated by commas.\n\nQuestion: {}",
        query
    )
}

#[async_trait]
impl Node for ExtractorNode {
    fn id(&self) -> &'static str {
        "extractor"
    }

    fn name(&self) -> &'static str {
        "Keyword Extractor"
    }

    async fn execute(
        &self,
        state: &mut SearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        state.keywords = match ctx.llm.generate(&keyword_prompt(&state.query)).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                state.note_degraded(self.id(), "empty keyword reply, using the query");
                state.query.clone()
            }
            Err(err) => {
                state.note_degraded(self.id(), format!("{}, using the query", err));
                state.query.clone()
            }
        };

        tracing::debug!(keywords = %state.keywords, "Extracted keywords");
        Ok(NodeOutput::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::Fixture;

    #[tokio::test]
    async fn uses_model_keywords() {
        let fixture = Fixture::new().await;
        fixture.mock.reply_when("Question: tomato care", " tomato, garden \n");

        let mut state = SearchState::new("tomato care", "c", 5);
        ExtractorNode::new().execute(&mut state, &fixture.ctx()).await.unwrap();
        assert_eq!(state.keywords, "tomato, garden");
        assert!(state.degraded.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_query_on_failure() {
        let fixture = Fixture::new().await;
        fixture.mock.set_failing(true);

        let mut state = SearchState::new("tomato care", "c", 5);
        ExtractorNode::new().execute(&mut state, &fixture.ctx()).await.unwrap();
        assert_eq!(state.keywords, "tomato care");
        assert_eq!(state.degraded.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_query_on_blank_reply() {
        let fixture = Fixture::new().await;
        fixture.mock.push_reply("   ");

        let mut state = SearchState::new("tomato care", "c", 5);
        ExtractorNode::new().execute(&mut state, &fixture.ctx()).await.unwrap();
        assert_eq!(state.keywords, "tomato care");
    }
}
