//! Bounded retention: once a subject holds more than `limit` facts, the
//! `take` oldest are folded into a single auto-summary fact and deleted.

use crate::config::RetentionPolicy;
use crate::db;
use crate::error::MemoryResult;
use crate::sentences::{first_sentence, truncate_chars};
use orion_memory_types::{Fact, PruneReport, origin};
use rusqlite::Connection;

const SNIPPET_SEPARATOR: &str = " | ";

/// Summary text for a batch of pruned facts. The count in the prefix is the
/// number of facts summarized, which can exceed the number of snippets shown.
pub fn build_auto_summary(facts: &[Fact], policy: &RetentionPolicy) -> String {
    let snippets: Vec<String> = facts
        .iter()
        .take(policy.max_snippets)
        .map(|f| {
            let sentence = first_sentence(&f.text);
            let sentence = if sentence.is_empty() {
                f.text.trim().to_string()
            } else {
                sentence
            };
            truncate_chars(&sentence, policy.snippet_chars)
        })
        .collect();

    format!(
        "Auto-summary ({} facts): {}",
        facts.len(),
        snippets.join(SNIPPET_SEPARATOR)
    )
}

/// Prune `subject_id` until it is back within the policy limit.
///
/// Callers are expected to run this inside the same transaction as the insert
/// that triggered it. Auto-summary facts are eligible for later passes like
/// any other fact.
pub fn prune_if_needed(
    conn: &Connection,
    subject_id: &str,
    policy: &RetentionPolicy,
) -> MemoryResult<PruneReport> {
    let mut report = PruneReport::default();
    let max_passes = policy.passes_needed(db::count_facts(conn, subject_id)?);

    for _ in 0..max_passes {
        let total = db::count_facts(conn, subject_id)?;
        if total <= policy.limit {
            break;
        }

        let oldest = db::oldest_facts(conn, subject_id, policy.take)?;
        if oldest.is_empty() {
            break;
        }

        let summary_text = build_auto_summary(&oldest, policy);
        let summary = db::insert_fact(conn, subject_id, &summary_text, origin::AUTO_PRUNE)?;

        let ids: Vec<_> = oldest.iter().map(|f| f.id).collect();
        db::delete_facts(conn, &ids)?;

        log::debug!(
            "[RETENTION] subject {}: folded {} facts into summary #{}",
            subject_id,
            ids.len(),
            summary.id
        );

        report.passes += 1;
        report.summarized += ids.len();
        report.summaries.push(summary.id);
        report.pruned.extend(ids);
    }

    let remaining = db::count_facts(conn, subject_id)?;
    if remaining > policy.limit {
        log::warn!(
            "[RETENTION] subject {} still holds {} facts after {} passes (limit {})",
            subject_id,
            remaining,
            report.passes,
            policy.limit
        );
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;

    fn fact(id: i64, text: &str) -> Fact {
        Fact {
            id,
            subject_id: "demo".to_string(),
            text: text.to_string(),
            origin: origin::MANUAL.to_string(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_summary_uses_first_sentences() {
        let policy = RetentionPolicy::default();
        let facts = vec![
            fact(1, "The sky is blue. It is often cloudy."),
            fact(2, "Paris is in France!"),
        ];
        assert_eq!(
            build_auto_summary(&facts, &policy),
            "Auto-summary (2 facts): The sky is blue. | Paris is in France!"
        );
    }

    #[test]
    fn test_summary_counts_all_facts_but_embeds_five_snippets() {
        let policy = RetentionPolicy::default();
        let facts: Vec<Fact> = (1..=10).map(|i| fact(i, &format!("Fact {}.", i))).collect();
        let summary = build_auto_summary(&facts, &policy);
        assert!(summary.starts_with("Auto-summary (10 facts): "));
        assert_eq!(summary.matches(SNIPPET_SEPARATOR).count(), 4);
        assert!(summary.ends_with("Fact 5."));
        assert!(!summary.contains("Fact 6."));
    }

    #[test]
    fn test_summary_truncates_long_snippets() {
        let policy = RetentionPolicy::default();
        let long = "x".repeat(200);
        let summary = build_auto_summary(&[fact(1, &long)], &policy);
        let snippet = summary.trim_start_matches("Auto-summary (1 facts): ");
        assert_eq!(snippet.chars().count(), 141);
        assert!(snippet.ends_with('…'));
    }

    #[test]
    fn test_prune_noop_within_limit() {
        let db = Db::open(":memory:").unwrap();
        let conn = db.conn().unwrap();
        let policy = RetentionPolicy::default();
        for i in 0..20 {
            db::insert_fact(&conn, "demo", &format!("fact {}", i), "manual").unwrap();
        }
        let report = prune_if_needed(&conn, "demo", &policy).unwrap();
        assert!(report.is_noop());
        assert_eq!(db::count_facts(&conn, "demo").unwrap(), 20);
    }

    #[test]
    fn test_prune_converges_with_tight_policy() {
        let db = Db::open(":memory:").unwrap();
        let conn = db.conn().unwrap();
        let policy = RetentionPolicy::new(3, 2).unwrap();
        for i in 0..10 {
            db::insert_fact(&conn, "demo", &format!("fact {}", i), "manual").unwrap();
        }
        let report = prune_if_needed(&conn, "demo", &policy).unwrap();
        assert_eq!(report.passes, 7);
        assert_eq!(report.pruned.len(), 14);
        assert_eq!(db::count_facts(&conn, "demo").unwrap(), 3);

        // later passes fold summaries from earlier ones
        let live: Vec<i64> = db::list_facts_newest_first(&conn, "demo")
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert!(report.pruned.iter().all(|id| !live.contains(id)));
        assert!(report.summaries.iter().any(|id| report.pruned.contains(id)));
    }

    #[test]
    fn test_prune_leaves_other_subjects_alone() {
        let db = Db::open(":memory:").unwrap();
        let conn = db.conn().unwrap();
        let policy = RetentionPolicy::new(2, 2).unwrap();
        for i in 0..5 {
            db::insert_fact(&conn, "demo", &format!("fact {}", i), "manual").unwrap();
            db::insert_fact(&conn, "other", &format!("fact {}", i), "manual").unwrap();
        }
        prune_if_needed(&conn, "demo", &policy).unwrap();
        assert_eq!(db::count_facts(&conn, "demo").unwrap(), 2);
        assert_eq!(db::count_facts(&conn, "other").unwrap(), 5);
    }
}
