//! Bounded undo ledger over remote note mutations.
//!
//! Entries are pushed after a mutation succeeds and hold enough of the prior
//! state to reverse it. Undo pops the newest entry and commits its reversal as
//! one atomic batch; if the commit fails the entry goes back on top, so the
//! same undo can be retried. Redo is not tracked.

use crate::models::Note;
use crate::storage::{to_fields, CollectionPath, DocumentStore, SetMode, WriteBatch};
use crate::Result;
use chrono::Utc;
use log::{info, warn};
use std::collections::VecDeque;

/// Most entries kept; older ones fall off the end.
pub const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Add,
    Delete,
    Update,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    Add { note_id: String, new_data: Note },
    Delete { note_id: String, old_data: Note },
    Update { note_id: String, old_data: Note, new_data: Note },
}

impl HistoryEntry {
    pub fn kind(&self) -> HistoryKind {
        match self {
            HistoryEntry::Add { .. } => HistoryKind::Add,
            HistoryEntry::Delete { .. } => HistoryKind::Delete,
            HistoryEntry::Update { .. } => HistoryKind::Update,
        }
    }

    pub fn note_id(&self) -> &str {
        match self {
            HistoryEntry::Add { note_id, .. }
            | HistoryEntry::Delete { note_id, .. }
            | HistoryEntry::Update { note_id, .. } => note_id,
        }
    }

    pub fn old_data(&self) -> Option<&Note> {
        match self {
            HistoryEntry::Add { .. } => None,
            HistoryEntry::Delete { old_data, .. } | HistoryEntry::Update { old_data, .. } => Some(old_data),
        }
    }

    pub fn new_data(&self) -> Option<&Note> {
        match self {
            HistoryEntry::Delete { .. } => None,
            HistoryEntry::Add { new_data, .. } | HistoryEntry::Update { new_data, .. } => Some(new_data),
        }
    }

    /// The writes that undo this entry.
    pub fn reversal(&self, collection: &CollectionPath) -> Result<WriteBatch> {
        let mut batch = WriteBatch::new();
        match self {
            HistoryEntry::Add { note_id, .. } => {
                batch.delete(collection, note_id);
            }
            HistoryEntry::Delete { note_id, old_data } => {
                // Full snapshot, original createdAt included, back at the original id.
                batch.set(collection, note_id, to_fields(old_data)?, SetMode::Replace);
            }
            HistoryEntry::Update { note_id, old_data, .. } => {
                let mut fields = to_fields(old_data)?;
                fields.insert("updatedAt".to_string(), serde_json::to_value(Utc::now())?);
                batch.set(collection, note_id, fields, SetMode::Merge);
            }
        }
        Ok(batch)
    }
}

#[derive(Debug, Default)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `entry` as the newest and drop anything past the limit
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn peek(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Entries newest first
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Reverse the newest entry. Returns the consumed entry, or `None` when
    /// there is nothing to undo. On failure the entry is back at the head.
    pub fn undo_last<S: DocumentStore + ?Sized>(
        &mut self,
        store: &S,
        collection: &CollectionPath,
    ) -> Result<Option<HistoryEntry>> {
        let Some(entry) = self.entries.pop_front() else {
            return Ok(None);
        };

        let outcome = entry
            .reversal(collection)
            .and_then(|batch| store.commit(batch));

        match outcome {
            Ok(()) => {
                info!("event=undo kind={:?} note={}", entry.kind(), entry.note_id());
                Ok(Some(entry))
            }
            Err(err) => {
                warn!("event=undo_failed kind={:?} note={} error={}", entry.kind(), entry.note_id(), err);
                self.entries.push_front(entry);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteDraft;
    use crate::storage::BatchOp;

    fn sample(id: &str) -> Note {
        let mut note = Note::new("u".to_string(), &NoteDraft::new(id), 10, 10);
        note.id = id.to_string();
        note
    }

    fn add(id: &str) -> HistoryEntry {
        HistoryEntry::Add {
            note_id: id.to_string(),
            new_data: sample(id),
        }
    }

    #[test]
    fn test_record_keeps_newest_first() {
        let mut history = History::new();
        history.record(add("a"));
        history.record(add("b"));
        assert_eq!(history.peek().map(HistoryEntry::note_id), Some("b"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_eleventh_entry_evicts_oldest() {
        let mut history = History::new();
        for i in 0..=HISTORY_LIMIT {
            history.record(add(&format!("n{}", i)));
        }
        assert_eq!(history.len(), HISTORY_LIMIT);
        let ids: Vec<&str> = history.iter().map(HistoryEntry::note_id).collect();
        assert_eq!(ids.first(), Some(&"n10"));
        assert!(!ids.contains(&"n0"));
    }

    #[test]
    fn test_entry_accessors() {
        let old = sample("a");
        let new = old.patched(&crate::models::NotePatch::struck_through(true));
        let entry = HistoryEntry::Update {
            note_id: "a".to_string(),
            old_data: old.clone(),
            new_data: new.clone(),
        };
        assert_eq!(entry.kind(), HistoryKind::Update);
        assert_eq!(entry.old_data(), Some(&old));
        assert_eq!(entry.new_data(), Some(&new));
        assert_eq!(add("z").old_data(), None);
    }

    #[test]
    fn test_add_reversal_deletes() {
        let path = CollectionPath::new("c");
        let batch = add("a").reversal(&path).unwrap();
        assert_eq!(
            batch.ops(),
            &[BatchOp::Delete {
                collection: path.clone(),
                id: "a".to_string()
            }]
        );
    }

    #[test]
    fn test_delete_reversal_replaces_full_snapshot() {
        let path = CollectionPath::new("c");
        let old = sample("a");
        let entry = HistoryEntry::Delete {
            note_id: "a".to_string(),
            old_data: old.clone(),
        };
        match &entry.reversal(&path).unwrap().ops()[0] {
            BatchOp::Set { id, data, mode, .. } => {
                assert_eq!(id, "a");
                assert_eq!(*mode, SetMode::Replace);
                assert!(data.get("id").is_none());
                assert_eq!(data["createdAt"], serde_json::to_value(old.created_at).unwrap());
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_update_reversal_merges_old_data_with_fresh_timestamp() {
        let path = CollectionPath::new("c");
        let mut old = sample("a");
        old.updated_at = Some(Utc::now() - chrono::Duration::hours(1));
        let entry = HistoryEntry::Update {
            note_id: "a".to_string(),
            old_data: old.clone(),
            new_data: old.clone(),
        };
        match &entry.reversal(&path).unwrap().ops()[0] {
            BatchOp::Set { data, mode, .. } => {
                assert_eq!(*mode, SetMode::Merge);
                assert_eq!(data["text"], "a");
                assert_ne!(data["updatedAt"], serde_json::to_value(old.updated_at).unwrap());
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let store = crate::storage::SqliteStore::in_memory().unwrap();
        let mut history = History::new();
        assert_eq!(history.undo_last(&store, &CollectionPath::new("c")).unwrap(), None);
    }
}
