// Formatter Node
// Renders the plain-text search report

use async_trait::async_trait;

use crate::graph::node::{GraphError, Node, NodeContext, NodeOutput};
use crate::graph::state::SearchState;
use crate::rag::ScoredResult;

pub const REPORT_HEADER: &str = "Search results:";
pub const ANSWER_MARKER: &str = "AI answer:";

/// Markers after which a report's answer starts, in lookup order.
const ANSWER_MARKERS: [&str; 3] = [ANSWER_MARKER, "Answer:", "==Conclusion=="];

pub struct FormatterNode;

impl FormatterNode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FormatterNode {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_report(results: &[ScoredResult], answer: &str) -> String {
    let mut report = format!("{}\n", REPORT_HEADER);
    if results.is_empty() {
        report.push_str("  - no results\n");
    }
    for result in results {
        report.push_str(&format!(
            "\n--- #{} ({:.1}%) ---\n\
             File: {}\n   \
             Location: {}\n   \
             Summary: {}\n   \
             Keywords: {}\n   \
             Type: {}\n",
            result.rank,
            result.relevance,
            result.file_name,
            result.file_location,
            result.summary,
            result.keywords,
            result.doc_type,
        ));
    }
    report.push_str(&format!("\n{}\n{}", ANSWER_MARKER, answer));
    report
}

/// The answer portion of a report: the text after the first known marker,
/// or the whole text when no marker is present.
pub fn extract_answer(report: &str) -> String {
    ANSWER_MARKERS
        .iter()
        .find_map(|marker| report.split_once(marker).map(|(_, tail)| tail.trim().to_string()))
        .unwrap_or_else(|| report.to_string())
}

#[async_trait]
impl Node for FormatterNode {
    fn id(&self) -> &'static str {
        "formatter"
    }

    fn name(&self) -> &'static str {
        "Result Formatter"
    }

    async fn execute(
        &self,
        state: &mut SearchState,
        _ctx: &NodeContext<'_>,
    ) -> Result<NodeOutput, GraphError> {
        state.report = format_report(&state.results, &state.answer);
        Ok(NodeOutput::Final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::ranked;

    #[test]
    fn report_has_one_block_per_result() {
        let report = format_report(&ranked(), "Pick a.txt");

        assert!(report.starts_with(REPORT_HEADER));
        assert!(report.contains("--- #1 (100.0%) ---"));
        assert!(report.contains("--- #2 (2.0%) ---"));
        assert!(report.contains("Location: no location on record"));
        assert!(report.ends_with("AI answer:\nPick a.txt"));
    }

    #[test]
    fn empty_report_says_no_results() {
        let report = format_report(&[], "No relevant information was found.");
        assert!(report.contains("  - no results"));
        assert!(!report.contains("---"));
    }

    #[test]
    fn extract_answer_uses_first_known_marker() {
        let report = format_report(&ranked(), "Answer: first\n==Conclusion==\nb.txt");
        assert_eq!(extract_answer(&report), "Answer: first\n==Conclusion==\nb.txt");

        assert_eq!(extract_answer("Answer:  only this "), "only this");
        assert_eq!(extract_answer("x ==Conclusion== y"), "y");
        assert_eq!(extract_answer("no markers here"), "no markers here");
    }
}
