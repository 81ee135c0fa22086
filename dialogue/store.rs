use std::{fs, path::Path, sync::Arc};

use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::predicate::MatchPredicate;
use crate::record::{DialoguePatch, DialogueRecord, NewDialogue};

/// Errors from snapshot persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the snapshot file failed.
    #[error("dialogue store io failure: {0}")]
    Io(#[from] std::io::Error),
    /// The snapshot contents could not be encoded or decoded.
    #[error("dialogue store serialization failure: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    next_id: u32,
    records: Vec<DialogueRecord>,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: IndexMap<u32, DialogueRecord>,
    next_id: u32,
}

/// Thread-safe in-memory store of taught dialogues.
///
/// Consumes [`MatchPredicate`] trees directly; there is no native query
/// language underneath.
#[derive(Debug, Clone, Default)]
pub struct DialogueStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl DialogueStore {
    /// Inserts a new record, assigning the next identifier.
    pub fn insert(&self, seed: NewDialogue) -> DialogueRecord {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let now = Utc::now();
        let record = DialogueRecord {
            id: inner.next_id,
            question: seed.question,
            original: seed.original,
            answer: seed.answer,
            flags: seed.flags,
            created_at: now,
            updated_at: now,
        };
        inner.records.insert(record.id, record.clone());
        record
    }

    /// Retrieves one record by id.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<DialogueRecord> {
        self.inner.read().records.get(&id).cloned()
    }

    /// Retrieves several records, reporting the ids that do not exist.
    #[must_use]
    pub fn get_many(&self, ids: &[u32]) -> (Vec<DialogueRecord>, Vec<u32>) {
        let inner = self.inner.read();
        let mut found = Vec::new();
        let mut missing = Vec::new();
        for id in ids {
            match inner.records.get(id) {
                Some(record) => found.push(record.clone()),
                None => missing.push(*id),
            }
        }
        (found, missing)
    }

    /// Returns every record satisfying the predicate, in insertion order.
    #[must_use]
    pub fn find(&self, predicate: &MatchPredicate) -> Vec<DialogueRecord> {
        self.inner
            .read()
            .records
            .values()
            .filter(|record| predicate.matches(record))
            .cloned()
            .collect()
    }

    /// Applies a partial update to one record, returning the new state.
    /// `None` when the record does not exist; an empty patch leaves the
    /// record untouched.
    pub fn apply(&self, id: u32, patch: &DialoguePatch) -> Option<DialogueRecord> {
        let mut inner = self.inner.write();
        let record = inner.records.get_mut(&id)?;
        if let Some(answer) = &patch.answer {
            record.answer = answer.clone();
        }
        if let Some((search, original)) = &patch.question {
            record.question = search.clone();
            record.original = original.clone();
        }
        if let Some(on) = patch.pattern_mode {
            record.flags.set_pattern(on);
        }
        if !patch.is_empty() {
            record.updated_at = Utc::now();
        }
        Some(record.clone())
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// True when no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }

    /// Snapshot of every record in insertion order.
    #[must_use]
    pub fn all(&self) -> Vec<DialogueRecord> {
        self.inner.read().records.values().cloned().collect()
    }

    /// Writes the store to a JSON snapshot file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let inner = self.inner.read();
        let snapshot = Snapshot {
            next_id: inner.next_id,
            records: inner.records.values().cloned().collect(),
        };
        fs::write(path, serde_json::to_vec_pretty(&snapshot)?)?;
        Ok(())
    }

    /// Loads a store from a JSON snapshot file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let snapshot: Snapshot = serde_json::from_slice(&fs::read(path)?)?;
        let mut records = IndexMap::new();
        let mut next_id = snapshot.next_id;
        for record in snapshot.records {
            next_id = next_id.max(record.id);
            records.insert(record.id, record);
        }
        Ok(Self {
            inner: Arc::new(RwLock::new(StoreInner { records, next_id })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{MatchField, MatchPredicate};
    use crate::record::DialogueFlags;
    use tempfile::tempdir;

    fn seed(question: &str, answer: &str) -> NewDialogue {
        NewDialogue {
            question: question.into(),
            original: question.into(),
            answer: answer.into(),
            flags: DialogueFlags::default(),
        }
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let store = DialogueStore::default();
        let first = store.insert(seed("hi", "hello"));
        let second = store.insert(seed("bye", "goodbye"));
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn get_many_reports_missing_ids() {
        let store = DialogueStore::default();
        store.insert(seed("hi", "hello"));
        let (found, missing) = store.get_many(&[1, 7]);
        assert_eq!(found.len(), 1);
        assert_eq!(missing, vec![7]);
    }

    #[test]
    fn find_filters_by_predicate() {
        let store = DialogueStore::default();
        store.insert(seed("hi", "hello"));
        store.insert(seed("bye", "goodbye"));
        let results = store.find(&MatchPredicate::Equals {
            field: MatchField::Question,
            value: "bye".into(),
        });
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].answer, "goodbye");
    }

    #[test]
    fn apply_updates_only_present_fields() {
        let store = DialogueStore::default();
        let record = store.insert(seed("hi", "hello"));
        let updated = store
            .apply(
                record.id,
                &DialoguePatch {
                    answer: Some("howdy".into()),
                    ..DialoguePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.answer, "howdy");
        assert_eq!(updated.question, "hi");
        assert!(!updated.flags.is_pattern());
    }

    #[test]
    fn snapshot_round_trip_preserves_records_and_counter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dialogues.json");
        let store = DialogueStore::default();
        store.insert(seed("hi", "hello"));
        store.insert(seed("bye", "goodbye"));
        store.save(&path).unwrap();

        let restored = DialogueStore::load(&path).unwrap();
        assert_eq!(restored.len(), 2);
        let next = restored.insert(seed("morning", "good morning"));
        assert_eq!(next.id, 3);
    }
}
