//! Display text built from recalled facts.

use crate::recall::render;
use orion_memory_types::{AnswerStyle, Fact};

/// Facts listed in a recall answer
const ANSWER_LIMIT: usize = 5;
/// Facts listed in a memory summary
const SUMMARY_LIMIT: usize = 10;
/// Facts listed in the provenance view
pub const PROVENANCE_LIMIT: usize = 10;

pub const NO_MATCH: &str = "I couldn't find anything for that query.";
pub const NO_FACTS: &str = "No facts stored yet.";

pub const ORION_INTRO: &str = "Orion is your AI-powered memory and task assistant. \
It remembers facts, manages tasks, provides summaries, \
and tracks provenance so you always know where knowledge came from.";

fn is_self_query(query: &str) -> bool {
    let q = query.trim().to_lowercase();
    q == "orion" || q.contains("what is orion")
}

/// Answer text for `query` given the recalled `facts` (already in display order).
pub fn compose_answer(query: &str, facts: &[Fact], style: AnswerStyle) -> String {
    if facts.is_empty() {
        return NO_MATCH.to_string();
    }
    if is_self_query(query) {
        return ORION_INTRO.to_string();
    }

    let query = query.trim();
    let mut answer = if query.is_empty() {
        "Here's what Orion remembers:\n".to_string()
    } else {
        format!("Here's what Orion knows related to '{}':\n", query)
    };
    for (i, fact) in facts.iter().take(ANSWER_LIMIT).enumerate() {
        answer.push_str(&format!("\n{}. {}", i + 1, render(&fact.text, style)));
    }
    answer
}

/// Numbered overview of the newest stored facts.
pub fn summarize(facts: &[Fact]) -> String {
    if facts.is_empty() {
        return NO_FACTS.to_string();
    }

    let mut summary = "Here's a quick summary of stored facts:\n".to_string();
    for (i, fact) in facts.iter().take(SUMMARY_LIMIT).enumerate() {
        summary.push_str(&format!("\n{}. {}", i + 1, fact.text));
    }
    summary
}

/// One line per fact describing where it came from and when.
pub fn provenance_lines(facts: &[Fact], limit: usize) -> Vec<String> {
    facts
        .iter()
        .take(limit)
        .map(|f| {
            format!(
                "Fact: {} — Source: {} — Time: {}",
                f.text, f.origin, f.created_at
            )
        })
        .collect()
}
