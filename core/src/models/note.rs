use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FontColor, FontSize, NoteColor};

/// Current version of the persisted note record.
pub const NOTE_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    NOTE_SCHEMA_VERSION
}

/// A sticky note as stored in the notes collection.
///
/// The id is the document key and never part of the document body. Every other
/// field carries its own default so that records written by older clients
/// still decode: missing palette entries fall back to the palette default and
/// missing coordinates are filled in by reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(skip)]
    pub id: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub note_color: NoteColor,
    #[serde(default)]
    pub font_color: FontColor,
    #[serde(default)]
    pub font_size: FontSize,
    #[serde(default)]
    pub is_struck_through: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "timestamp::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: String,
}

impl Note {
    /// Build a fresh note from a draft. The id stays empty until the store assigns one.
    pub fn new(user_id: String, draft: &NoteDraft, x: i32, y: i32) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            schema_version: NOTE_SCHEMA_VERSION,
            text: draft.text.clone(),
            note_color: draft.note_color,
            font_color: draft.font_color,
            font_size: draft.font_size,
            is_struck_through: false,
            x: Some(x),
            y: Some(y),
            created_at: Some(now),
            updated_at: Some(now),
            user_id,
        }
    }

    /// Update the modified timestamp
    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    /// Overlay the fields present in `patch`.
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(color) = patch.note_color {
            self.note_color = color;
        }
        if let Some(color) = patch.font_color {
            self.font_color = color;
        }
        if let Some(size) = patch.font_size {
            self.font_size = size;
        }
        if let Some(struck) = patch.is_struck_through {
            self.is_struck_through = struck;
        }
        if let Some(x) = patch.x {
            self.x = Some(x);
        }
        if let Some(y) = patch.y {
            self.y = Some(y);
        }
        if let Some(updated_at) = patch.updated_at {
            self.updated_at = Some(updated_at);
        }
    }

    /// Same note with `patch` applied.
    pub fn patched(&self, patch: &NotePatch) -> Self {
        let mut note = self.clone();
        note.apply(patch);
        note
    }
}

/// Contents of the creation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteDraft {
    pub text: String,
    pub note_color: NoteColor,
    pub font_color: FontColor,
    pub font_size: FontSize,
}

impl NoteDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn from_note(note: &Note) -> Self {
        Self {
            text: note.text.clone(),
            note_color: note.note_color,
            font_color: note.font_color,
            font_size: note.font_size,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Patch that writes this draft over an existing note
    pub fn to_patch(&self) -> NotePatch {
        NotePatch {
            text: Some(self.text.clone()),
            note_color: Some(self.note_color),
            font_color: Some(self.font_color),
            font_size: Some(self.font_size),
            updated_at: Some(Utc::now()),
            ..NotePatch::default()
        }
    }
}

/// Partial note body for merge writes. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_color: Option<NoteColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_color: Option<FontColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<FontSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_struck_through: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NotePatch {
    pub fn position(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn struck_through(struck: bool) -> Self {
        Self {
            is_struck_through: Some(struck),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    pub fn note_color(color: NoteColor) -> Self {
        Self {
            note_color: Some(color),
            updated_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// Timestamps are RFC 3339 strings; `{ seconds, nanoseconds }` objects from
/// older exports are also accepted.
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Rfc3339(DateTime<Utc>),
        Parts {
            seconds: i64,
            #[serde(default)]
            nanoseconds: u32,
        },
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = Option::<Repr>::deserialize(deserializer)?;
        Ok(repr.and_then(|repr| match repr {
            Repr::Rfc3339(at) => Some(at),
            Repr::Parts { seconds, nanoseconds } => DateTime::from_timestamp(seconds, nanoseconds),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_creation() {
        let draft = NoteDraft::new("Buy milk");
        let note = Note::new("user-1".to_string(), &draft, 20, 20);
        assert_eq!(note.text, "Buy milk");
        assert!(note.id.is_empty());
        assert!(!note.is_struck_through);
        assert_eq!(note.created_at, note.updated_at);
        assert_eq!((note.x, note.y), (Some(20), Some(20)));
    }

    #[test]
    fn test_note_touch() {
        let mut note = Note::new("u".to_string(), &NoteDraft::new("Test"), 0, 0);
        let original = note.updated_at;

        std::thread::sleep(std::time::Duration::from_millis(10));
        note.touch();

        assert!(note.updated_at > original);
        assert!(note.created_at < note.updated_at);
    }

    #[test]
    fn test_id_is_not_part_of_body() {
        let mut note = Note::new("u".to_string(), &NoteDraft::new("Test"), 0, 0);
        note.id = "abc".to_string();
        let body = serde_json::to_value(&note).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["noteColor"], "Yellow");
        assert_eq!(body["isStruckThrough"], false);
    }

    #[test]
    fn test_legacy_record_defaults() {
        let note: Note = serde_json::from_value(json!({
            "text": "old note",
            "noteColor": { "name": "Pink", "bg": "bg-pink-200" },
            "createdAt": { "seconds": 1700000000, "nanoseconds": 0 }
        }))
        .unwrap();
        assert_eq!(note.schema_version, NOTE_SCHEMA_VERSION);
        assert_eq!(note.note_color, NoteColor::Pink);
        assert_eq!(note.font_color, FontColor::Black);
        assert_eq!(note.font_size, FontSize::Medium);
        assert_eq!(note.x, None);
        assert_eq!(note.created_at.map(|at| at.timestamp()), Some(1_700_000_000));
        assert_eq!(note.updated_at, None);
    }

    #[test]
    fn test_patch_only_serializes_present_fields() {
        let patch = NotePatch::struck_through(true);
        let body = serde_json::to_value(&patch).unwrap();
        let keys: Vec<_> = body.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(body["isStruckThrough"], true);
        assert!(body.get("updatedAt").is_some());
    }

    #[test]
    fn test_apply_patch_leaves_other_fields() {
        let note = Note::new("u".to_string(), &NoteDraft::new("Keep"), 10, 10);
        let moved = note.patched(&NotePatch::position(100, 50));
        assert_eq!((moved.x, moved.y), (Some(100), Some(50)));
        assert_eq!(moved.text, "Keep");
        assert_eq!(moved.created_at, note.created_at);
    }

    #[test]
    fn test_blank_draft() {
        assert!(NoteDraft::new("   \n").is_blank());
        assert!(!NoteDraft::new(" x ").is_blank());
    }
}
