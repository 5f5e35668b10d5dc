//! Application state for one user's canvas.
//!
//! `Board` owns the store handle, the live subscription, the reconciled canvas
//! and the undo ledger. Every mutation goes to the store first; the canvas is
//! then refreshed from the subscription, which stays the source of truth. The
//! one exception is a drag commit, which is shown optimistically and rolled
//! back if the write fails.
//!
//! Remote failures never escape as panics: each one lands in the storage alert
//! slot and is also returned to the caller.

use crate::ai::AiError;
use crate::history::{History, HistoryEntry};
use crate::models::{Note, NoteColor, NoteDraft, NotePatch};
use crate::reconcile::{new_note_position, Canvas, PlacedNote};
use crate::storage::{CollectionPath, DocumentStore, NoteRepository, SnapshotEvent, Subscription};
use crate::{Error, Result};
use log::{debug, info, warn};

pub const ADD_FAILED: &str = "Failed to add note.";
pub const UPDATE_FAILED: &str = "Failed to update note.";
pub const DELETE_FAILED: &str = "Failed to delete note.";
pub const STATUS_FAILED: &str = "Failed to update note status.";
pub const COLOR_FAILED: &str = "Failed to update note color.";
pub const POSITION_FAILED: &str = "Failed to save note position.";
pub const UNDO_FAILED: &str = "Failed to undo action.";
pub const LOAD_FAILED: &str = "Could not load notes. Please check your connection.";

/// The two user-visible error slots. A new error replaces the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Alerts {
    pub ai: Option<String>,
    pub storage: Option<String>,
}

impl Alerts {
    /// The message to show, AI errors first
    pub fn banner(&self) -> Option<&str> {
        self.ai.as_deref().or(self.storage.as_deref())
    }

    pub fn clear(&mut self) {
        self.ai = None;
        self.storage = None;
    }
}

pub struct Board<S: DocumentStore> {
    store: S,
    collection: CollectionPath,
    user_id: String,
    canvas: Canvas,
    history: History,
    subscription: Option<Subscription>,
    /// Note to focus as soon as a snapshot contains it
    focus_request: Option<String>,
    loaded: bool,
    alerts: Alerts,
}

impl<S: DocumentStore> Board<S> {
    /// Subscribe to `collection` and apply the initial snapshot.
    pub fn open(store: S, collection: CollectionPath, user_id: impl Into<String>) -> Self {
        let mut board = Self {
            store,
            collection,
            user_id: user_id.into(),
            canvas: Canvas::default(),
            history: History::new(),
            subscription: None,
            focus_request: None,
            loaded: false,
            alerts: Alerts::default(),
        };

        match board.store.subscribe(&board.collection) {
            Ok(subscription) => board.subscription = Some(subscription),
            Err(err) => {
                warn!("event=subscribe_failed collection={} error={}", board.collection, err);
                board.alerts.storage = Some(LOAD_FAILED.to_string());
            }
        }
        board.sync();
        board
    }

    /// Drain pending snapshot events and apply the newest one.
    /// Returns true when the canvas was rebuilt.
    pub fn sync(&mut self) -> bool {
        let Some(subscription) = &self.subscription else {
            return false;
        };
        let events: Vec<SnapshotEvent> = subscription.drain().collect();

        let mut latest = None;
        for event in events {
            match event {
                SnapshotEvent::Snapshot(documents) => latest = Some(documents),
                SnapshotEvent::Failed(message) => {
                    warn!("event=snapshot_failed collection={} error={}", self.collection, message);
                    self.alerts.storage = Some(LOAD_FAILED.to_string());
                }
            }
        }

        match latest {
            Some(documents) => {
                let notes = NoteRepository::decode_all(&documents);
                let wanted = self
                    .focus_request
                    .clone()
                    .or_else(|| self.canvas.focused_id().map(str::to_string));
                self.canvas = Canvas::reconcile(notes, wanted.as_deref());
                if let Some(requested) = &self.focus_request {
                    if self.canvas.get(requested).is_some() {
                        self.focus_request = None;
                    }
                }
                self.loaded = true;
                debug!("event=snapshot_applied notes={}", self.canvas.len());
                true
            }
            None => false,
        }
    }

    /// Create a note from `draft`. Blank drafts are ignored and yield `None`.
    pub fn add_note(&mut self, draft: &NoteDraft) -> Result<Option<String>> {
        if draft.is_blank() {
            return Ok(None);
        }

        let (x, y) = new_note_position(self.canvas.len());
        let mut note = Note::new(self.user_id.clone(), draft, x, y);
        let id = match NoteRepository::create(&self.store, &self.collection, &note) {
            Ok(id) => id,
            Err(err) => return Err(self.fail(ADD_FAILED, "add", err)),
        };

        note.id = id.clone();
        info!("event=note_added note={}", id);
        self.history.record(HistoryEntry::Add {
            note_id: id.clone(),
            new_data: note,
        });
        self.focus_request = Some(id.clone());
        self.sync();
        Ok(Some(id))
    }

    /// Overwrite text and palette fields of `id` with `draft`. Blank drafts are ignored.
    pub fn update_note(&mut self, id: &str, draft: &NoteDraft) -> Result<()> {
        if draft.is_blank() {
            return Ok(());
        }
        self.apply_patch(id, draft.to_patch(), UPDATE_FAILED, "update")
    }

    pub fn delete_note(&mut self, id: &str) -> Result<()> {
        let old = self.current(id)?;
        if let Err(err) = NoteRepository::delete(&self.store, &self.collection, id) {
            return Err(self.fail(DELETE_FAILED, "delete", err));
        }

        info!("event=note_deleted note={}", id);
        self.history.record(HistoryEntry::Delete {
            note_id: id.to_string(),
            old_data: old,
        });
        if self.canvas.focused_id() == Some(id) {
            let successor = self.canvas.successor_of(id);
            self.focus_request = None;
            self.canvas.focus(successor.as_deref());
        }
        self.sync();
        Ok(())
    }

    pub fn toggle_strike_through(&mut self, id: &str) -> Result<()> {
        let struck = self.current(id)?.is_struck_through;
        self.apply_patch(id, NotePatch::struck_through(!struck), STATUS_FAILED, "strike")
    }

    pub fn change_note_color(&mut self, id: &str, color: NoteColor) -> Result<()> {
        self.apply_patch(id, NotePatch::note_color(color), COLOR_FAILED, "color")
    }

    /// Persist the end of a drag. The new position shows immediately and is
    /// rolled back if the write fails.
    pub fn commit_position(&mut self, id: &str, x: i32, y: i32) -> Result<()> {
        let old = self.current(id)?;
        if old.x == Some(x) && old.y == Some(y) {
            return Ok(());
        }

        let patch = NotePatch::position(x, y);
        let moved = old.patched(&patch);
        self.canvas.replace_note(moved.clone());

        if let Err(err) = NoteRepository::merge(&self.store, &self.collection, id, &patch) {
            self.canvas.replace_note(old);
            return Err(self.fail(POSITION_FAILED, "move", err));
        }

        debug!("event=note_moved note={} x={} y={}", id, x, y);
        self.history.record(HistoryEntry::Update {
            note_id: id.to_string(),
            old_data: old,
            new_data: moved,
        });
        self.sync();
        Ok(())
    }

    /// Raise `id` above every other note. `None` focuses the newest.
    pub fn focus(&mut self, id: Option<&str>) {
        self.focus_request = None;
        self.canvas.focus(id);
    }

    /// Reverse the newest ledger entry. Does nothing when the ledger is empty.
    pub fn undo(&mut self) -> Result<()> {
        let entry = match self.history.undo_last(&self.store, &self.collection) {
            Ok(Some(entry)) => entry,
            Ok(None) => return Ok(()),
            Err(err) => return Err(self.fail(UNDO_FAILED, "undo", err)),
        };

        match entry {
            // The note is gone; reconciliation picks the newest survivor.
            HistoryEntry::Add { .. } => {}
            HistoryEntry::Delete { note_id, .. } => {
                self.focus_request = Some(note_id);
            }
            HistoryEntry::Update { note_id, old_data, .. } => {
                self.canvas.replace_note(old_data);
                self.focus_request = Some(note_id.clone());
                self.canvas.focus(Some(&note_id));
            }
        }
        self.sync();
        Ok(())
    }

    pub fn report_ai_error(&mut self, err: &AiError) {
        warn!("event=ai_alert error={:?}", err);
        self.raise_ai_alert(err.to_string());
    }

    /// Show `message` in the AI slot
    pub fn raise_ai_alert(&mut self, message: impl Into<String>) {
        self.alerts.ai = Some(message.into());
    }

    pub fn clear_ai_alert(&mut self) {
        self.alerts.ai = None;
    }

    /// Show `message` in the storage slot
    pub fn raise_storage_alert(&mut self, message: impl Into<String>) {
        self.alerts.storage = Some(message.into());
    }

    pub fn alerts(&self) -> &Alerts {
        &self.alerts
    }

    pub fn dismiss_alerts(&mut self) {
        self.alerts.clear();
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn note(&self, id: &str) -> Option<&PlacedNote> {
        self.canvas.get(id)
    }

    pub fn focused_id(&self) -> Option<&str> {
        self.canvas.focused_id()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// At least one snapshot has been applied
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn current(&self, id: &str) -> Result<Note> {
        self.canvas
            .get(id)
            .map(|placed| placed.note.clone())
            .ok_or_else(|| Error::NotFound(format!("note {}", id)))
    }

    fn apply_patch(&mut self, id: &str, patch: NotePatch, alert: &str, op: &str) -> Result<()> {
        let old = self.current(id)?;
        if let Err(err) = NoteRepository::merge(&self.store, &self.collection, id, &patch) {
            return Err(self.fail(alert, op, err));
        }

        info!("event=note_updated note={} op={}", id, op);
        let new = old.patched(&patch);
        self.canvas.replace_note(new.clone());
        self.history.record(HistoryEntry::Update {
            note_id: id.to_string(),
            old_data: old,
            new_data: new,
        });
        self.sync();
        Ok(())
    }

    fn fail(&mut self, alert: &str, op: &str, err: Error) -> Error {
        warn!("event=store_write_failed op={} error={}", op, err);
        self.alerts.storage = Some(alert.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryKind;
    use crate::models::{FontSize, NoteColor};
    use crate::storage::SqliteStore;

    fn board() -> Board<SqliteStore> {
        let store = SqliteStore::in_memory().unwrap();
        Board::open(store, CollectionPath::notes("app", "u1"), "u1")
    }

    #[test]
    fn test_open_empty_collection() {
        let board = board();
        assert!(board.is_loaded());
        assert!(board.canvas().is_empty());
        assert!(!board.can_undo());
        assert_eq!(board.alerts().banner(), None);
    }

    #[test]
    fn test_blank_draft_is_ignored() {
        let mut board = board();
        assert_eq!(board.add_note(&NoteDraft::new("   ")).unwrap(), None);
        assert!(board.canvas().is_empty());
        assert!(!board.can_undo());
    }

    #[test]
    fn test_add_places_and_focuses_new_note() {
        let mut board = board();
        let first = board.add_note(&NoteDraft::new("one")).unwrap().unwrap();
        let second = board.add_note(&NoteDraft::new("two")).unwrap().unwrap();

        assert_eq!(board.focused_id(), Some(second.as_str()));
        assert_eq!(board.note(&first).unwrap().position(), (20, 20));
        assert_eq!(board.note(&second).unwrap().position(), (45, 20));
        assert_eq!(board.note(&second).unwrap().note.user_id, "u1");
    }

    #[test]
    fn test_update_records_old_values() {
        let mut board = board();
        let id = board.add_note(&NoteDraft::new("draft")).unwrap().unwrap();
        let draft = NoteDraft {
            text: "final".to_string(),
            note_color: NoteColor::Blue,
            font_size: FontSize::Large,
            ..NoteDraft::default()
        };
        board.update_note(&id, &draft).unwrap();

        let placed = board.note(&id).unwrap();
        assert_eq!(placed.note.text, "final");
        assert_eq!(placed.note.note_color, NoteColor::Blue);
        let entry = board.history().peek().unwrap();
        assert_eq!(entry.kind(), HistoryKind::Update);
        assert_eq!(entry.old_data().unwrap().text, "draft");
    }

    #[test]
    fn test_toggle_and_color_each_record_one_entry() {
        let mut board = board();
        let id = board.add_note(&NoteDraft::new("x")).unwrap().unwrap();
        board.toggle_strike_through(&id).unwrap();
        board.change_note_color(&id, NoteColor::Green).unwrap();

        let placed = board.note(&id).unwrap();
        assert!(placed.note.is_struck_through);
        assert_eq!(placed.note.note_color, NoteColor::Green);
        assert_eq!(board.history().len(), 3);

        board.undo().unwrap();
        assert_eq!(board.note(&id).unwrap().note.note_color, NoteColor::Yellow);
        board.undo().unwrap();
        assert!(!board.note(&id).unwrap().note.is_struck_through);
    }

    #[test]
    fn test_deleting_focused_note_focuses_newest_remaining() {
        let mut board = board();
        let a = board.add_note(&NoteDraft::new("a")).unwrap().unwrap();
        let b = board.add_note(&NoteDraft::new("b")).unwrap().unwrap();
        let c = board.add_note(&NoteDraft::new("c")).unwrap().unwrap();

        board.delete_note(&c).unwrap();
        assert!(board.note(&c).is_none());
        assert_eq!(board.focused_id(), Some(b.as_str()));

        board.focus(Some(&a));
        board.delete_note(&b).unwrap();
        assert_eq!(board.focused_id(), Some(a.as_str()));
    }

    #[test]
    fn test_unchanged_position_is_noop() {
        let mut board = board();
        let id = board.add_note(&NoteDraft::new("x")).unwrap().unwrap();
        board.commit_position(&id, 20, 20).unwrap();
        assert_eq!(board.history().len(), 1);
    }

    #[test]
    fn test_unknown_note_is_not_found_without_alert() {
        let mut board = board();
        assert!(matches!(board.toggle_strike_through("missing"), Err(Error::NotFound(_))));
        assert_eq!(board.alerts().storage, None);
    }

    #[test]
    fn test_ai_alert_takes_precedence() {
        let mut board = board();
        board.raise_storage_alert(LOAD_FAILED);
        board.report_ai_error(&AiError::RateLimit);
        assert_eq!(board.alerts().banner(), Some("AI service is busy. Please try again shortly."));
        board.dismiss_alerts();
        assert_eq!(board.alerts().banner(), None);
    }

    #[test]
    fn test_external_writes_arrive_through_sync() {
        let mut board = board();
        let note = Note::new("u1".to_string(), &NoteDraft::new("from elsewhere"), 0, 0);
        NoteRepository::create(board.store(), board.collection(), &note).unwrap();

        assert!(board.sync());
        assert_eq!(board.canvas().len(), 1);
        assert!(!board.can_undo());
    }
}
