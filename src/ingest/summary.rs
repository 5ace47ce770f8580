//! Summarization prompt and reply parsing.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

pub const UNTITLED: &str = "untitled";
pub const NO_SUMMARY: &str = "no summary";
pub const NO_KEYWORDS: &str = "no keywords";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedSummary {
    pub title: String,
    pub summary: String,
    pub keywords: String,
}

pub fn summary_prompt(text: &str, max_summary_chars: usize) -> String {
    format!(
        "Analyze the following document and extract the items below, one per line.\n\n\
         title: the document title on one line\n\
         summary: a detailed synopsis of the whole content in at most {max} characters\n\
         keywords: about 50 key terms of the document on one line, separated by commas\n\n\
         Reply only in this format.\n\
         title: ...\n\
         summary: ...\n\
         keywords: ...\n\n\
         Document:\n\"{text}\"",
        max = max_summary_chars,
        text = text,
    )
}

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)title\s*:\s*(.+?)(?:\n|summary\s*:|$)").expect("Invalid title regex")
});
static SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)summary\s*:\s*(.+?)(?:\n|keywords\s*:|$)").expect("Invalid summary regex")
});
static KEYWORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)keywords\s*:\s*(.+?)(?:\n|$)").expect("Invalid keywords regex"));

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts `title:`, `summary:` and `keywords:` from a model reply.
///
/// Missing fields become placeholders. A summary longer than
/// `max_summary_chars` is cut to `max_summary_chars - 3` characters plus `...`.
pub fn parse_summary(reply: &str, max_summary_chars: usize) -> ParsedSummary {
    let mut summary = capture(&SUMMARY_RE, reply).unwrap_or_else(|| NO_SUMMARY.to_string());
    if summary.chars().count() > max_summary_chars {
        let head: String = summary
            .chars()
            .take(max_summary_chars.saturating_sub(3))
            .collect();
        summary = format!("{}...", head);
    }

    ParsedSummary {
        title: capture(&TITLE_RE, reply).unwrap_or_else(|| UNTITLED.to_string()),
        summary,
        keywords: capture(&KEYWORDS_RE, reply).unwrap_or_else(|| NO_KEYWORDS.to_string()),
    }
}
