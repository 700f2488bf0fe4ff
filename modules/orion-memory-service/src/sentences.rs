//! Heuristic sentence splitting.
//!
//! A boundary is any `.`, `!` or `?` followed by whitespace. Abbreviations
//! ("Dr. Smith"), decimals followed by a space and quoted punctuation are not
//! special-cased; callers get exactly what the pattern yields.

use once_cell::sync::Lazy;
use regex::Regex;

/// Terminal punctuation followed by at least one whitespace character
static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Marker appended to anything cut short
pub const ELLIPSIS: &str = "…";

/// Split `text` into trimmed, non-empty sentences in order.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(text) {
        // punctuation is one byte, keep it with the sentence it ends
        let end = boundary.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = boundary.end();
    }
    push_trimmed(&mut sentences, &text[start..]);

    sentences
}

/// First sentence of `text`, or an empty string for blank input.
pub fn first_sentence(text: &str) -> String {
    split_sentences(text).into_iter().next().unwrap_or_default()
}

/// Cut `text` to at most `max_chars` characters, appending [`ELLIPSIS`] if
/// anything was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], ELLIPSIS),
        None => text.to_string(),
    }
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}
