// Answer Node
// Asks the chat model which files answer the query

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::SearchState;
use crate::llm::ChatMessage;

pub const NO_RESULTS_ANSWER: &str = "No relevant information was found.";
pub const ANSWER_FAILED: &str =
    "Sorry, an answer could not be generated right now. The ranked documents above are still valid.";

pub struct AnswerNode;

impl AnswerNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnswerNode {
    fn default() -> Self {
        Self::new()
    }
}

pub fn answer_prompt(source_list: &str, context: &str, query: &str) -> String {
    format!(
        "Answer the user's question using the search result summary and document contents below.\n\
         - Base the answer only on what the documents state.\n\
         - If the information is missing, say clearly that there is no information.\n\
         - Keep a polite, professional tone.\n\n\
         ### Search result summary:\n{sources}\n\n\
         ### Document contents:\n{context}\n\n\
         ### User question:\n{query}\n\n\
         ### Answer:\n\
         List only the file names from the search result summary that relate to the question,\n\
         the three most relevant first (file name - summary - keywords - type).\n\n\
         ==Conclusion==\n\
         Recommend exactly one file (file name - summary).",
        sources = source_list,
        context = context,
        query = query,
    )
}

#[async_trait]
impl Node for AnswerNode {
    fn id(&self) -> &'static str {
        "answer"
    }

    fn name(&self) -> &'static str {
        "Answer Generator"
    }

    async fn execute(
        &self,
        state: &mut SearchState,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        if state.results.is_empty() {
            state.answer = NO_RESULTS_ANSWER.to_string();
            return Ok(NodeOutput::Continue);
        }

        let prompt = answer_prompt(
            &ctx.context_builder.source_list(&state.results),
            &state.context,
            &state.query,
        );

        state.answer = match ctx.llm.chat(vec![ChatMessage::user(prompt)]).await {
            Ok(reply) => reply.trim().to_string(),
            Err(err) => {
                state.note_degraded(self.id(), err);
                ANSWER_FAILED.to_string()
            }
        };
        Ok(NodeOutput::Continue)
    }
}
