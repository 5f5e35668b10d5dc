use super::document::{to_fields, CollectionPath, Document, DocumentStore, SetMode};
use crate::models::{Note, NotePatch, NOTE_SCHEMA_VERSION};
use crate::{Error, Result};
use log::warn;
use serde_json::Value;

/// Typed access to the notes collection.
pub struct NoteRepository;

impl NoteRepository {
    /// Create a note, returning the store-assigned id
    pub fn create<S: DocumentStore + ?Sized>(store: &S, collection: &CollectionPath, note: &Note) -> Result<String> {
        store.create(collection, to_fields(note)?)
    }

    /// Merge the fields present in `patch` into an existing note
    pub fn merge<S: DocumentStore + ?Sized>(
        store: &S,
        collection: &CollectionPath,
        id: &str,
        patch: &NotePatch,
    ) -> Result<()> {
        store.set(collection, id, to_fields(patch)?, SetMode::Merge)
    }

    /// Write `note` back at its own id, replacing whatever is there
    pub fn restore<S: DocumentStore + ?Sized>(store: &S, collection: &CollectionPath, note: &Note) -> Result<()> {
        if note.id.is_empty() {
            return Err(Error::InvalidInput("cannot restore a note without an id".to_string()));
        }
        store.set(collection, &note.id, to_fields(note)?, SetMode::Replace)
    }

    pub fn delete<S: DocumentStore + ?Sized>(store: &S, collection: &CollectionPath, id: &str) -> Result<()> {
        store.delete(collection, id)
    }

    /// All valid notes in the collection; invalid records are skipped
    pub fn list<S: DocumentStore + ?Sized>(store: &S, collection: &CollectionPath) -> Result<Vec<Note>> {
        Ok(Self::decode_all(&store.list(collection)?))
    }

    /// Validate and decode one stored document
    pub fn decode(document: &Document) -> Result<Note> {
        let mut note: Note = serde_json::from_value(Value::Object(document.data.clone())).map_err(|err| {
            Error::Validation {
                id: document.id.clone(),
                reason: err.to_string(),
            }
        })?;

        if note.schema_version > NOTE_SCHEMA_VERSION {
            return Err(Error::Validation {
                id: document.id.clone(),
                reason: format!("unsupported schema version {}", note.schema_version),
            });
        }

        note.id = document.id.clone();
        Ok(note)
    }

    /// Decode a snapshot, dropping records that fail validation
    pub fn decode_all(documents: &[Document]) -> Vec<Note> {
        documents
            .iter()
            .filter_map(|document| match Self::decode(document) {
                Ok(note) => Some(note),
                Err(err) => {
                    warn!("event=note_skipped error={}", err);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NoteColor, NoteDraft};
    use crate::storage::SqliteStore;
    use serde_json::json;

    fn setup() -> (SqliteStore, CollectionPath) {
        (SqliteStore::in_memory().unwrap(), CollectionPath::notes("app", "u1"))
    }

    fn document(id: &str, value: serde_json::Value) -> Document {
        Document {
            id: id.to_string(),
            data: value.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_create_note() {
        let (store, path) = setup();
        let note = Note::new("u1".to_string(), &NoteDraft::new("Test Note"), 20, 20);

        let id = NoteRepository::create(&store, &path, &note).unwrap();

        let notes = NoteRepository::list(&store, &path).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, id);
        assert_eq!(notes[0].text, "Test Note");
        assert_eq!(notes[0].created_at, note.created_at);
    }

    #[test]
    fn test_merge_note() {
        let (store, path) = setup();
        let note = Note::new("u1".to_string(), &NoteDraft::new("Original"), 20, 20);
        let id = NoteRepository::create(&store, &path, &note).unwrap();

        NoteRepository::merge(&store, &path, &id, &NotePatch::note_color(NoteColor::Green)).unwrap();

        let stored = &NoteRepository::list(&store, &path).unwrap()[0];
        assert_eq!(stored.note_color, NoteColor::Green);
        assert_eq!(stored.text, "Original");
    }

    #[test]
    fn test_restore_requires_id() {
        let (store, path) = setup();
        let note = Note::new("u1".to_string(), &NoteDraft::new("x"), 0, 0);
        assert!(matches!(
            NoteRepository::restore(&store, &path, &note),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_delete_note() {
        let (store, path) = setup();
        let note = Note::new("u1".to_string(), &NoteDraft::new("To Delete"), 0, 0);
        let id = NoteRepository::create(&store, &path, &note).unwrap();

        NoteRepository::delete(&store, &path, &id).unwrap();

        assert!(NoteRepository::list(&store, &path).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_newer_schema() {
        let doc = document("n1", json!({ "text": "future", "schemaVersion": 2 }));
        assert!(matches!(NoteRepository::decode(&doc), Err(Error::Validation { .. })));
    }

    #[test]
    fn test_decode_all_skips_invalid_records() {
        let docs = vec![
            document("good", json!({ "text": "fine" })),
            document("bad", json!({ "text": "x", "noteColor": "Chartreuse" })),
        ];
        let notes = NoteRepository::decode_all(&docs);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, "good");
    }
}
