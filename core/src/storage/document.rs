use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::mpsc::Receiver;

/// Body of a stored document: a JSON object.
pub type Fields = Map<String, Value>;

/// Slash-separated path naming a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The per-user notes collection: `artifacts/{app_id}/users/{user_id}/stickyNotes`
    pub fn notes(app_id: &str, user_id: &str) -> Self {
        Self(format!("artifacts/{}/users/{}/stickyNotes", app_id, user_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as returned by queries and snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Overwrite the whole document body
    Replace,
    /// Shallow merge into the existing body, creating the document if missing
    Merge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Set {
        collection: CollectionPath,
        id: String,
        data: Fields,
        mode: SetMode,
    },
    Delete {
        collection: CollectionPath,
        id: String,
    },
}

impl BatchOp {
    pub fn collection(&self) -> &CollectionPath {
        match self {
            BatchOp::Set { collection, .. } | BatchOp::Delete { collection, .. } => collection,
        }
    }
}

/// Writes committed together: either all apply or none do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, collection: &CollectionPath, id: &str, data: Fields, mode: SetMode) -> &mut Self {
        self.ops.push(BatchOp::Set {
            collection: collection.clone(),
            id: id.to_string(),
            data,
            mode,
        });
        self
    }

    pub fn delete(&mut self, collection: &CollectionPath, id: &str) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            collection: collection.clone(),
            id: id.to_string(),
        });
        self
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Event delivered to a collection subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// Full contents of the collection after a change
    Snapshot(Vec<Document>),
    /// The listener could not read the collection
    Failed(String),
}

/// Handle to a live collection subscription.
///
/// Events queue up until drained. Dropping the handle (or calling
/// [`Subscription::cancel`]) unregisters the listener; the receiving end goes
/// with it, so nothing is delivered afterwards.
pub struct Subscription {
    receiver: Receiver<SnapshotEvent>,
    on_cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(receiver: Receiver<SnapshotEvent>, on_cancel: impl FnOnce() + 'static) -> Self {
        Self {
            receiver,
            on_cancel: Some(Box::new(on_cancel)),
        }
    }

    /// Next queued event, if any
    pub fn try_next(&self) -> Option<SnapshotEvent> {
        self.receiver.try_recv().ok()
    }

    /// All queued events, oldest first
    pub fn drain(&self) -> impl Iterator<Item = SnapshotEvent> + '_ {
        self.receiver.try_iter()
    }

    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(on_cancel) = self.on_cancel.take() {
            on_cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// A realtime document database.
pub trait DocumentStore {
    /// Insert a document under a store-assigned id
    fn create(&self, collection: &CollectionPath, data: Fields) -> Result<String>;

    fn set(&self, collection: &CollectionPath, id: &str, data: Fields, mode: SetMode) -> Result<()>;

    /// Remove a document. Deleting a missing document succeeds.
    fn delete(&self, collection: &CollectionPath, id: &str) -> Result<()>;

    /// Every document in the collection, in insertion order
    fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>>;

    /// Listen for changes. The current snapshot is queued immediately.
    fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription>;

    /// Apply every write in `batch` atomically.
    fn commit(&self, batch: WriteBatch) -> Result<()>;
}

/// Serialize `value` into a document body.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::InvalidInput(format!(
            "document body must be an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::mpsc;

    #[test]
    fn test_notes_collection_path() {
        let path = CollectionPath::notes("app", "user-7");
        assert_eq!(path.as_str(), "artifacts/app/users/user-7/stickyNotes");
    }

    #[test]
    fn test_batch_collects_ops_in_order() {
        let path = CollectionPath::new("c");
        let mut batch = WriteBatch::new();
        batch.delete(&path, "a").set(&path, "b", Fields::new(), SetMode::Merge);
        assert_eq!(batch.ops().len(), 2);
        assert!(matches!(batch.ops()[0], BatchOp::Delete { ref id, .. } if id == "a"));
        assert_eq!(batch.ops()[1].collection(), &path);
    }

    #[test]
    fn test_drop_runs_cancel_once() {
        let cancelled = Rc::new(Cell::new(0));
        let (_tx, rx) = mpsc::channel();
        let counter = cancelled.clone();
        let subscription = Subscription::new(rx, move || counter.set(counter.get() + 1));
        subscription.cancel();
        assert_eq!(cancelled.get(), 1);
    }

    #[test]
    fn test_to_fields_rejects_non_objects() {
        assert!(to_fields(&"text").is_err());
        assert!(to_fields(&serde_json::json!({ "a": 1 })).is_ok());
    }
}
