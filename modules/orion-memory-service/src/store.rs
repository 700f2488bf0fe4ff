//! Fact store: per-subject append-only facts with bounded retention.
//!
//! Every insert and the retention pass it triggers run in one transaction
//! while the connection lock is held, so writers are serialized.

use crate::config::RetentionPolicy;
use crate::db::{self, Db};
use crate::error::MemoryResult;
use crate::retention;
use crate::sentences::split_sentences;
use orion_memory_types::*;
use rusqlite::Connection;

/// Sentences quoted in a book-mode summary fact
const BOOK_SUMMARY_SENTENCES: usize = 3;

pub struct FactStore {
    db: Db,
    policy: RetentionPolicy,
}

impl FactStore {
    /// Open (or create) the store at `path`. The policy is validated before
    /// the database is touched.
    pub fn open(path: &str, policy: RetentionPolicy) -> MemoryResult<Self> {
        policy.validate()?;
        let db = Db::open(path)?;
        Ok(Self { db, policy })
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Store `text` for `subject_id`. Blank text is ignored and yields `None`.
    pub fn add_fact(&self, subject_id: &str, text: &str, origin: &str) -> MemoryResult<Option<Fact>> {
        let conn = self.db.conn()?;
        let tx = conn.unchecked_transaction()?;
        let (fact, _) = add_in(&tx, &self.policy, subject_id, text, origin)?;
        tx.commit()?;
        Ok(fact)
    }

    /// All facts for a subject, newest first.
    pub fn get_facts(&self, subject_id: &str) -> MemoryResult<Vec<Fact>> {
        let conn = self.db.conn()?;
        db::list_facts_newest_first(&conn, subject_id)
    }

    /// Up to `n` facts, oldest first.
    pub fn oldest_n(&self, subject_id: &str, n: usize) -> MemoryResult<Vec<Fact>> {
        let conn = self.db.conn()?;
        db::oldest_facts(&conn, subject_id, n)
    }

    pub fn count(&self, subject_id: &str) -> MemoryResult<usize> {
        let conn = self.db.conn()?;
        db::count_facts(&conn, subject_id)
    }

    /// Delete exactly these ids, whatever subject they belong to.
    pub fn delete_ids(&self, ids: &[FactId]) -> MemoryResult<usize> {
        let conn = self.db.conn()?;
        let deleted = db::delete_facts(&conn, ids)?;
        if deleted > 0 {
            log::info!("Deleted {} facts by id", deleted);
        }
        Ok(deleted)
    }

    pub fn clear(&self, subject_id: &str) -> MemoryResult<usize> {
        let conn = self.db.conn()?;
        let deleted = db::delete_subject_facts(&conn, subject_id)?;
        log::info!("Cleared {} facts for subject {}", deleted, subject_id);
        Ok(deleted)
    }

    pub fn save_pref(&self, subject_id: &str, style: AnswerStyle) -> MemoryResult<()> {
        let conn = self.db.conn()?;
        db::set_answer_style(&conn, subject_id, style)
    }

    pub fn get_pref(&self, subject_id: &str) -> MemoryResult<AnswerStyle> {
        let conn = self.db.conn()?;
        db::get_answer_style(&conn, subject_id)
    }

    /// Run retention for a subject without inserting anything.
    pub fn enforce_retention(&self, subject_id: &str) -> MemoryResult<PruneReport> {
        let conn = self.db.conn()?;
        let tx = conn.unchecked_transaction()?;
        let report = retention::prune_if_needed(&tx, subject_id, &self.policy)?;
        tx.commit()?;
        Ok(report)
    }

    /// Store each sentence of `text` as its own `book_mode` fact, followed by a
    /// `book_mode_summary` fact quoting the opening sentences.
    pub fn ingest_book(&self, subject_id: &str, text: &str) -> MemoryResult<Vec<Fact>> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.db.conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut stored: Vec<Fact> = Vec::with_capacity(sentences.len() + 1);
        for sentence in &sentences {
            let (fact, report) = add_in(&tx, &self.policy, subject_id, sentence, origin::BOOK_MODE)?;
            keep_live(&mut stored, fact, &report);
        }

        let summary = format!(
            "Book summary ({} sentences): {}",
            sentences.len(),
            sentences
                .iter()
                .take(BOOK_SUMMARY_SENTENCES)
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(" ")
        );
        let (fact, report) = add_in(&tx, &self.policy, subject_id, &summary, origin::BOOK_MODE_SUMMARY)?;
        keep_live(&mut stored, fact, &report);

        tx.commit()?;
        log::info!(
            "Ingested {} sentences for subject {}",
            sentences.len(),
            subject_id
        );
        Ok(stored)
    }

    /// Record thumbs-up / thumbs-down feedback as a fact.
    pub fn record_feedback(&self, subject_id: &str, text: &str, positive: bool) -> MemoryResult<Option<Fact>> {
        let tag = if positive {
            origin::FEEDBACK_UP
        } else {
            origin::FEEDBACK_DOWN
        };
        self.add_fact(subject_id, text, tag)
    }

    pub fn stats(&self) -> MemoryResult<MemoryStats> {
        let conn = self.db.conn()?;
        db::get_stats(&conn)
    }

    pub fn export_all(&self) -> MemoryResult<Vec<BackupEntry>> {
        let conn = self.db.conn()?;
        let entries = db::list_all_facts(&conn)?
            .into_iter()
            .map(|f| BackupEntry {
                subject_id: f.subject_id,
                text: f.text,
                origin: f.origin,
                created_at: f.created_at,
            })
            .collect();
        Ok(entries)
    }

    /// Replace every stored fact with `entries`, then bring each subject back
    /// within the retention limit. Blank entries are skipped.
    pub fn clear_and_restore(&self, entries: &[BackupEntry]) -> MemoryResult<usize> {
        let conn = self.db.conn()?;
        let tx = conn.unchecked_transaction()?;

        db::delete_all_facts(&tx)?;

        let mut count = 0;
        for entry in entries {
            let text = entry.text.trim();
            if text.is_empty() {
                continue;
            }
            db::insert_fact_at(&tx, &entry.subject_id, text, &entry.origin, &entry.created_at)?;
            count += 1;
        }

        for subject_id in db::list_subjects(&tx)? {
            retention::prune_if_needed(&tx, &subject_id, &self.policy)?;
        }

        tx.commit()?;
        log::info!("Restored {} facts from backup", count);
        Ok(count)
    }
}

/// Drop anything the last prune deleted, then keep the new fact if it survived.
fn keep_live(stored: &mut Vec<Fact>, fact: Option<Fact>, report: &PruneReport) {
    if !report.pruned.is_empty() {
        stored.retain(|f| !report.pruned.contains(&f.id));
    }
    if let Some(fact) = fact {
        if !report.pruned.contains(&fact.id) {
            stored.push(fact);
        }
    }
}

/// Insert then prune on an already-open transaction.
fn add_in(
    conn: &Connection,
    policy: &RetentionPolicy,
    subject_id: &str,
    text: &str,
    origin: &str,
) -> MemoryResult<(Option<Fact>, PruneReport)> {
    let text = text.trim();
    if text.is_empty() {
        log::debug!("Ignoring blank fact for subject {}", subject_id);
        return Ok((None, PruneReport::default()));
    }

    let fact = db::insert_fact(conn, subject_id, text, origin)?;
    let report = retention::prune_if_needed(conn, subject_id, policy)?;
    if !report.is_noop() {
        log::info!(
            "Pruned {} facts for subject {} into {} summaries",
            report.summarized,
            subject_id,
            report.summaries.len()
        );
    }
    Ok((Some(fact), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;

    fn test_store() -> FactStore {
        FactStore::open(":memory:", RetentionPolicy::default()).expect("in-memory store")
    }

    #[test]
    fn test_add_fact_trims_and_assigns_increasing_ids() {
        let store = test_store();
        let a = store.add_fact("demo", "  first fact  ", origin::MANUAL).unwrap().unwrap();
        let b = store.add_fact("demo", "second fact", origin::MANUAL).unwrap().unwrap();
        assert_eq!(a.text, "first fact");
        assert!(b.id > a.id);

        let facts = store.get_facts("demo").unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].id, b.id);
        assert_eq!(facts.iter().filter(|f| f.text == "first fact").count(), 1);
    }

    #[test]
    fn test_blank_fact_is_a_noop() {
        let store = test_store();
        store.add_fact("demo", "kept", origin::MANUAL).unwrap();
        assert_eq!(store.add_fact("demo", "   ", origin::MANUAL).unwrap(), None);
        assert_eq!(store.add_fact("demo", "", origin::MANUAL).unwrap(), None);
        assert_eq!(store.count("demo").unwrap(), 1);
    }

    #[test]
    fn test_twenty_one_facts_prune_to_twelve() {
        let store = test_store();
        for i in 1..=21 {
            store
                .add_fact("demo", &format!("Fact number {}. Extra detail.", i), origin::MANUAL)
                .unwrap();
        }

        let facts = store.get_facts("demo").unwrap();
        assert_eq!(facts.len(), 12);

        let summaries: Vec<&Fact> = facts.iter().filter(|f| f.origin == origin::AUTO_PRUNE).collect();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].text.starts_with("Auto-summary (10 facts): Fact number 1."));
        // newest first, summary inserted last
        assert_eq!(facts[0].id, summaries[0].id);

        let oldest = store.oldest_n("demo", 1).unwrap();
        assert_eq!(oldest[0].text, "Fact number 11. Extra detail.");
    }

    #[test]
    fn test_store_never_exceeds_limit_after_insert() {
        let store = FactStore::open(":memory:", RetentionPolicy::new(5, 3).unwrap()).unwrap();
        for i in 0..50 {
            store.add_fact("demo", &format!("note {}", i), origin::MANUAL).unwrap();
            assert!(store.count("demo").unwrap() <= 5);
        }
    }

    #[test]
    fn test_invalid_policy_rejected_before_open() {
        let policy = RetentionPolicy {
            take: 1,
            ..RetentionPolicy::default()
        };
        assert!(matches!(
            FactStore::open(":memory:", policy),
            Err(MemoryError::Configuration(_))
        ));
    }

    #[test]
    fn test_oldest_n_bounds() {
        let store = test_store();
        for i in 0..3 {
            store.add_fact("demo", &format!("f{}", i), origin::MANUAL).unwrap();
        }
        assert!(store.oldest_n("demo", 0).unwrap().is_empty());
        let texts: Vec<String> = store
            .oldest_n("demo", 10)
            .unwrap()
            .into_iter()
            .map(|f| f.text)
            .collect();
        assert_eq!(texts, vec!["f0", "f1", "f2"]);
    }

    #[test]
    fn test_delete_ids_crosses_subjects_and_is_idempotent() {
        let store = test_store();
        let a = store.add_fact("demo", "a", origin::MANUAL).unwrap().unwrap();
        let b = store.add_fact("other", "b", origin::MANUAL).unwrap().unwrap();
        assert_eq!(store.delete_ids(&[a.id, b.id]).unwrap(), 2);
        assert_eq!(store.delete_ids(&[a.id, b.id]).unwrap(), 0);
        assert_eq!(store.delete_ids(&[]).unwrap(), 0);
    }

    #[test]
    fn test_clear_twice_is_not_an_error() {
        let store = test_store();
        store.add_fact("demo", "something", origin::MANUAL).unwrap();
        store.add_fact("other", "kept", origin::MANUAL).unwrap();
        store.clear("demo").unwrap();
        assert_eq!(store.count("demo").unwrap(), 0);
        assert_eq!(store.clear("demo").unwrap(), 0);
        assert_eq!(store.count("demo").unwrap(), 0);
        assert_eq!(store.count("other").unwrap(), 1);
    }

    #[test]
    fn test_prefs_round_trip_per_subject() {
        let store = test_store();
        assert_eq!(store.get_pref("demo").unwrap(), AnswerStyle::Short);
        store.save_pref("demo", AnswerStyle::Detailed).unwrap();
        assert_eq!(store.get_pref("demo").unwrap(), AnswerStyle::Detailed);
        assert_eq!(store.get_pref("other").unwrap(), AnswerStyle::Short);
    }

    #[test]
    fn test_enforce_retention_within_limit_is_noop() {
        let store = test_store();
        store.add_fact("demo", "only one", origin::MANUAL).unwrap();
        let report = store.enforce_retention("demo").unwrap();
        assert!(report.is_noop());
        assert_eq!(store.count("demo").unwrap(), 1);
    }

    #[test]
    fn test_ingest_book_stores_sentences_and_summary() {
        let store = test_store();
        let stored = store
            .ingest_book("demo", "Call me Ishmael. Some years ago I went to sea! Why? Because.")
            .unwrap();
        assert_eq!(stored.len(), 5);
        assert!(stored[..4].iter().all(|f| f.origin == origin::BOOK_MODE));
        assert_eq!(stored[0].text, "Call me Ishmael.");

        let summary = &stored[4];
        assert_eq!(summary.origin, origin::BOOK_MODE_SUMMARY);
        assert_eq!(
            summary.text,
            "Book summary (4 sentences): Call me Ishmael. Some years ago I went to sea! Why?"
        );

        assert!(store.ingest_book("demo", "  \n ").unwrap().is_empty());
        assert_eq!(store.count("demo").unwrap(), 5);
    }

    #[test]
    fn test_ingest_book_returns_only_surviving_facts() {
        let store = test_store();
        let text: Vec<String> = (1..=25).map(|i| format!("Sentence number {}.", i)).collect();
        let stored = store.ingest_book("demo", &text.join(" ")).unwrap();

        let live: Vec<FactId> = store.get_facts("demo").unwrap().iter().map(|f| f.id).collect();
        assert!(live.len() <= 20);
        assert!(!stored.is_empty());
        assert!(stored.iter().all(|f| live.contains(&f.id)));
        assert_eq!(stored.last().unwrap().origin, origin::BOOK_MODE_SUMMARY);
        assert_eq!(stored[0].text, "Sentence number 11.");
    }

    /// Break the facts table underneath the store.
    fn drop_facts_table(store: &FactStore) {
        let conn = store.db.conn().unwrap();
        conn.execute_batch("DROP TABLE facts").unwrap();
    }

    #[test]
    fn test_broken_storage_is_reported() {
        let store = test_store();
        store.add_fact("demo", "before", origin::MANUAL).unwrap();
        drop_facts_table(&store);

        assert!(matches!(
            store.add_fact("demo", "after", origin::MANUAL),
            Err(MemoryError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.get_facts("demo"),
            Err(MemoryError::StorageUnavailable(_))
        ));
        assert!(matches!(
            store.enforce_retention("demo"),
            Err(MemoryError::StorageUnavailable(_))
        ));
        // blank input never reaches storage
        assert_eq!(store.add_fact("demo", "  ", origin::MANUAL).unwrap(), None);
    }

    #[test]
    fn test_failed_prune_rolls_back_insert() {
        let store = test_store();
        for i in 0..20 {
            store.add_fact("demo", &format!("fact {}", i), origin::MANUAL).unwrap();
        }
        let before = store.get_facts("demo").unwrap();

        {
            let conn = store.db.conn().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER block_deletes BEFORE DELETE ON facts
                 BEGIN SELECT RAISE(ABORT, 'deletes blocked'); END;",
            )
            .unwrap();
        }

        // the insert succeeds, the prune that follows cannot delete
        let err = store.add_fact("demo", "one too many", origin::MANUAL).unwrap_err();
        assert!(err.is_storage_unavailable());

        {
            let conn = store.db.conn().unwrap();
            conn.execute_batch("DROP TRIGGER block_deletes").unwrap();
        }

        assert_eq!(store.get_facts("demo").unwrap(), before);
        assert_eq!(store.count("demo").unwrap(), 20);
    }

    #[test]
    fn test_feedback_origins() {
        let store = test_store();
        let up = store.record_feedback("demo", "good answer", true).unwrap().unwrap();
        let down = store.record_feedback("demo", "bad answer", false).unwrap().unwrap();
        assert_eq!(up.origin, origin::FEEDBACK_UP);
        assert_eq!(down.origin, origin::FEEDBACK_DOWN);
        assert_eq!(store.record_feedback("demo", " ", true).unwrap(), None);
    }

    #[test]
    fn test_export_and_restore() {
        let store = test_store();
        store.add_fact("demo", "one", origin::MANUAL).unwrap();
        store.add_fact("other", "two", origin::BOOK_MODE).unwrap();
        let backup = store.export_all().unwrap();
        assert_eq!(backup.len(), 2);

        store.add_fact("demo", "after backup", origin::MANUAL).unwrap();
        assert_eq!(store.clear_and_restore(&backup).unwrap(), 2);
        assert_eq!(store.count("demo").unwrap(), 1);
        assert_eq!(store.get_facts("other").unwrap()[0].origin, origin::BOOK_MODE);
    }

    #[test]
    fn test_restore_applies_retention() {
        let store = test_store();
        let backup: Vec<BackupEntry> = (0..25)
            .map(|i| BackupEntry {
                subject_id: "demo".to_string(),
                text: format!("restored {}", i),
                origin: origin::MANUAL.to_string(),
                created_at: "2024-01-01T00:00:00+00:00".to_string(),
            })
            .collect();
        assert_eq!(store.clear_and_restore(&backup).unwrap(), 25);
        assert!(store.count("demo").unwrap() <= 20);
    }

    #[test]
    fn test_stats() {
        let store = test_store();
        store.add_fact("demo", "a", origin::MANUAL).unwrap();
        store.record_feedback("demo", "b", true).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.total_facts, 2);
        assert_eq!(stats.subject_count, 1);
    }

    #[test]
    fn test_facts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.db");
        let path = path.to_str().unwrap();

        {
            let store = FactStore::open(path, RetentionPolicy::default()).unwrap();
            store.add_fact("demo", "persisted", origin::MANUAL).unwrap();
            store.save_pref("demo", AnswerStyle::Detailed).unwrap();
        }

        let store = FactStore::open(path, RetentionPolicy::default()).unwrap();
        let facts = store.get_facts("demo").unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].text, "persisted");
        assert_eq!(store.get_pref("demo").unwrap(), AnswerStyle::Detailed);
    }
}
