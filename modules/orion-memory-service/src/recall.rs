//! Best-effort recall over a subject's facts plus answer-style rendering.
//!
//! Recall never fails: when neither the substring nor the keyword pass finds
//! anything, the newest facts are returned as the nearest available answer.

use crate::sentences::{ELLIPSIS, first_sentence};
use orion_memory_types::{AnswerStyle, Fact, RecallTier};

/// Facts returned when nothing matches
pub const FALLBACK_LIMIT: usize = 5;
/// Query tokens this short are ignored by the keyword pass
const MIN_KEYWORD_CHARS: usize = 3;
/// Words kept by SHORT rendering
const SHORT_WORD_LIMIT: usize = 20;

/// Recall against `facts` (newest first), keeping their order.
pub fn recall(facts: &[Fact], query: &str) -> Vec<Fact> {
    recall_ranked(facts, query).1
}

/// Like [`recall`], also reporting which tier produced the result.
pub fn recall_ranked(facts: &[Fact], query: &str) -> (RecallTier, Vec<Fact>) {
    if facts.is_empty() {
        return (RecallTier::NoMemory, Vec::new());
    }

    if query.trim().is_empty() {
        return (RecallTier::All, facts.to_vec());
    }

    // matched as given, surrounding whitespace included
    let needle = query.to_lowercase();
    let substring: Vec<Fact> = facts
        .iter()
        .filter(|f| f.text.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    if !substring.is_empty() {
        return (RecallTier::Substring, substring);
    }

    let keywords = keywords(&needle);
    let by_keyword: Vec<Fact> = facts
        .iter()
        .filter(|f| {
            let haystack = f.text.to_lowercase();
            keywords.iter().any(|k| haystack.contains(k.as_str()))
        })
        .cloned()
        .collect();
    if !by_keyword.is_empty() {
        return (RecallTier::Keyword, by_keyword);
    }

    let fallback = facts.iter().take(FALLBACK_LIMIT).cloned().collect();
    (RecallTier::Fallback, fallback)
}

fn keywords(query_lower: &str) -> Vec<String> {
    query_lower
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_KEYWORD_CHARS)
        .map(|t| t.to_string())
        .collect()
}

/// Render fact text for display in the given style.
pub fn render(text: &str, style: AnswerStyle) -> String {
    match style {
        AnswerStyle::Detailed => text.to_string(),
        AnswerStyle::Short => {
            let sentence = first_sentence(text);
            let words: Vec<&str> = sentence.split_whitespace().collect();
            if words.len() > SHORT_WORD_LIMIT {
                format!("{}{}", words[..SHORT_WORD_LIMIT].join(" "), ELLIPSIS)
            } else {
                words.join(" ")
            }
        }
    }
}
