//! Turns raw snapshots into a display-ready canvas.
//!
//! # Invariants
//! - `original_z_index` is the 1-based rank of the note by ascending `created_at`.
//! - At most one note is focused, and its `z_index` is `len + 100`, above every
//!   other note (whose `z_index` equals its `original_z_index`).
//! - Explicit coordinates are never overwritten; missing ones are derived from rank.
//! - Reconciling the same inputs twice yields the same canvas.

use crate::models::Note;

/// Added to the note count to lift the focused note above every rank.
pub const FOCUS_Z_BOOST: usize = 100;

/// Coordinates for a stored note that has none, by its rank in creation order.
pub fn default_position(index: usize) -> (i32, i32) {
    let col = (index % 10) as i32;
    let row = (index / 10) as i32;
    (col * 20 + 10, row * 20 + 10)
}

/// Where a note created from the form is first placed, given how many exist.
pub fn new_note_position(count: usize) -> (i32, i32) {
    let col = (count % 10) as i32;
    let row = (count / 10) as i32;
    (20 + col * 25, 20 + row * 25)
}

/// A note with concrete position and stacking order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNote {
    /// The note, with `x` and `y` always populated
    pub note: Note,
    pub original_z_index: usize,
    pub z_index: usize,
}

impl PlacedNote {
    pub fn id(&self) -> &str {
        &self.note.id
    }

    pub fn position(&self) -> (i32, i32) {
        (self.note.x.unwrap_or_default(), self.note.y.unwrap_or_default())
    }
}

/// Every note currently on screen plus the focused one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Canvas {
    notes: Vec<PlacedNote>,
    focused: Option<String>,
}

impl Canvas {
    /// Build the canvas for a snapshot, keeping `focused` when it still exists.
    pub fn reconcile(mut snapshot: Vec<Note>, focused: Option<&str>) -> Self {
        // Stable sort: ties keep store order, and `None` sorts before any timestamp.
        snapshot.sort_by_key(|note| note.created_at);

        let notes = snapshot
            .into_iter()
            .enumerate()
            .map(|(index, mut note)| {
                let (default_x, default_y) = default_position(index);
                note.x = Some(note.x.unwrap_or(default_x));
                note.y = Some(note.y.unwrap_or(default_y));
                PlacedNote {
                    note,
                    original_z_index: index + 1,
                    z_index: index + 1,
                }
            })
            .collect();

        let mut canvas = Self { notes, focused: None };
        canvas.focus(focused);
        canvas
    }

    /// Focus `id` and restack. An absent or unknown id focuses the newest note.
    pub fn focus(&mut self, id: Option<&str>) {
        let target = id
            .filter(|id| self.notes.iter().any(|placed| placed.id() == *id))
            .map(str::to_string)
            .or_else(|| self.notes.last().map(|placed| placed.id().to_string()));

        let boosted = self.notes.len() + FOCUS_Z_BOOST;
        for placed in &mut self.notes {
            placed.z_index = if Some(placed.id()) == target.as_deref() {
                boosted
            } else {
                placed.original_z_index
            };
        }
        self.focused = target;
    }

    pub fn focused_id(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Notes in creation order
    pub fn notes(&self) -> &[PlacedNote] {
        &self.notes
    }

    /// Notes bottom-most first, ready to paint
    pub fn render_order(&self) -> Vec<&PlacedNote> {
        let mut ordered: Vec<&PlacedNote> = self.notes.iter().collect();
        ordered.sort_by_key(|placed| placed.z_index);
        ordered
    }

    pub fn get(&self, id: &str) -> Option<&PlacedNote> {
        self.notes.iter().find(|placed| placed.id() == id)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Swap in a locally changed copy of a note, keeping its stacking order.
    /// Missing coordinates on `note` keep the current ones.
    pub fn replace_note(&mut self, mut note: Note) -> bool {
        match self.notes.iter_mut().find(|placed| placed.id() == note.id) {
            Some(placed) => {
                note.x = note.x.or(placed.note.x);
                note.y = note.y.or(placed.note.y);
                placed.note = note;
                true
            }
            None => false,
        }
    }

    /// The note to focus once `removed` is gone: the newest of the rest.
    pub fn successor_of(&self, removed: &str) -> Option<String> {
        self.notes
            .iter()
            .filter(|placed| placed.id() != removed)
            .max_by_key(|placed| placed.original_z_index)
            .map(|placed| placed.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NoteDraft;
    use chrono::{Duration, TimeZone, Utc};

    fn note(id: &str, minutes: Option<i64>) -> Note {
        let mut note = Note::new("u".to_string(), &NoteDraft::new(id), 0, 0);
        note.id = id.to_string();
        note.x = None;
        note.y = None;
        note.created_at = minutes.map(|m| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(m));
        note
    }

    #[test]
    fn test_default_positions_follow_creation_order() {
        let snapshot: Vec<Note> = (0..25).rev().map(|i| note(&format!("n{}", i), Some(i))).collect();
        let canvas = Canvas::reconcile(snapshot, None);

        for (i, placed) in canvas.notes().iter().enumerate() {
            assert_eq!(placed.id(), format!("n{}", i));
            let expected = ((i % 10) as i32 * 20 + 10, (i / 10) as i32 * 20 + 10);
            assert_eq!(placed.position(), expected);
            assert_eq!(placed.original_z_index, i + 1);
        }
    }

    #[test]
    fn test_explicit_coordinates_are_kept() {
        let mut moved = note("a", Some(1));
        moved.x = Some(300);
        let canvas = Canvas::reconcile(vec![moved, note("b", Some(2))], None);
        assert_eq!(canvas.get("a").unwrap().position(), (300, 10));
    }

    #[test]
    fn test_missing_timestamp_sorts_first() {
        let canvas = Canvas::reconcile(vec![note("dated", Some(5)), note("legacy", None)], None);
        assert_eq!(canvas.notes()[0].id(), "legacy");
        assert_eq!(canvas.get("dated").unwrap().original_z_index, 2);
    }

    #[test]
    fn test_newest_is_focused_by_default() {
        let canvas = Canvas::reconcile(vec![note("a", Some(1)), note("b", Some(2)), note("c", Some(3))], None);
        assert_eq!(canvas.focused_id(), Some("c"));
        assert_eq!(canvas.get("c").unwrap().z_index, 103);
        assert_eq!(canvas.get("a").unwrap().z_index, 1);
    }

    #[test]
    fn test_focused_note_is_strictly_highest() {
        for count in 1..30 {
            let snapshot: Vec<Note> = (0..count).map(|i| note(&format!("n{}", i), Some(i as i64))).collect();
            let canvas = Canvas::reconcile(snapshot, Some("n0"));
            let focused = canvas.get("n0").unwrap();
            assert!(focused.z_index >= count + 100);
            for other in canvas.notes().iter().filter(|p| p.id() != "n0") {
                assert!(focused.z_index > other.z_index);
                assert_eq!(other.z_index, other.original_z_index);
            }
        }
    }

    #[test]
    fn test_unknown_focus_falls_back_to_newest() {
        let canvas = Canvas::reconcile(vec![note("a", Some(1)), note("b", Some(2))], Some("gone"));
        assert_eq!(canvas.focused_id(), Some("b"));
    }

    #[test]
    fn test_empty_snapshot_has_no_focus() {
        let canvas = Canvas::reconcile(vec![], Some("a"));
        assert!(canvas.is_empty());
        assert_eq!(canvas.focused_id(), None);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let snapshot = vec![note("b", Some(2)), note("a", Some(1)), note("c", None)];
        let once = Canvas::reconcile(snapshot.clone(), Some("a"));
        let again = Canvas::reconcile(once.notes().iter().map(|p| p.note.clone()).collect(), once.focused_id());
        assert_eq!(once, again);
    }

    #[test]
    fn test_refocus_restores_previous_rank() {
        let mut canvas = Canvas::reconcile(vec![note("a", Some(1)), note("b", Some(2))], None);
        canvas.focus(Some("a"));
        assert_eq!(canvas.get("a").unwrap().z_index, 102);
        assert_eq!(canvas.get("b").unwrap().z_index, 2);
        let order: Vec<&str> = canvas.render_order().iter().map(|p| p.id()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_replace_note_keeps_rank() {
        let mut canvas = Canvas::reconcile(vec![note("a", Some(1)), note("b", Some(2))], None);
        let mut edited = canvas.get("a").unwrap().note.clone();
        edited.text = "changed".to_string();
        edited.x = None;
        assert!(canvas.replace_note(edited));
        let placed = canvas.get("a").unwrap();
        assert_eq!(placed.note.text, "changed");
        assert_eq!(placed.position(), (10, 10));
        assert_eq!(placed.original_z_index, 1);
    }

    #[test]
    fn test_successor_is_newest_remaining() {
        let canvas = Canvas::reconcile(vec![note("a", Some(1)), note("b", Some(2)), note("c", Some(3))], None);
        assert_eq!(canvas.successor_of("c").as_deref(), Some("b"));
        assert_eq!(canvas.successor_of("a").as_deref(), Some("c"));
    }

    #[test]
    fn test_new_note_position() {
        assert_eq!(new_note_position(0), (20, 20));
        assert_eq!(new_note_position(3), (95, 20));
        assert_eq!(new_note_position(12), (70, 45));
    }
}
