mod database;
mod document;
mod note_repository;
mod sqlite_store;

pub use database::{Connection, Database, SCHEMA_VERSION};
pub use document::{
    to_fields, BatchOp, CollectionPath, Document, DocumentStore, Fields, SetMode, SnapshotEvent, Subscription,
    WriteBatch,
};
pub use note_repository::NoteRepository;
pub use sqlite_store::SqliteStore;
