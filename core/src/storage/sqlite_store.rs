use super::database::{Connection, Database};
use super::document::{
    BatchOp, CollectionPath, Document, DocumentStore, Fields, SetMode, SnapshotEvent, Subscription, WriteBatch,
};
use crate::identity::IdentityProvider;
use crate::{Error, Result};
use chrono::Utc;
use log::{debug, info, warn};
use rusqlite::{params, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};

const ANONYMOUS_UID_KEY: &str = "anonymous_uid";

struct Listener {
    collection: CollectionPath,
    sender: Sender<SnapshotEvent>,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: HashMap<u64, Listener>,
}

/// Document store backed by a single SQLite database.
///
/// Listeners are notified synchronously after every committed write; events
/// queue on the subscription until the owner drains them.
pub struct SqliteStore {
    conn: Connection,
    listeners: Rc<RefCell<Listeners>>,
}

impl SqliteStore {
    /// Open the database at `path`, creating it with the schema when missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Database::file(path);
        let conn = db.open()?;
        info!("event=store_open path={}", db.location());
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(Database::Memory.open()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            listeners: Rc::new(RefCell::new(Listeners::default())),
        }
    }

    /// All or nothing: the transaction rolls back when dropped uncommitted
    fn apply_batch(&self, batch: &WriteBatch, now: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for op in batch.ops() {
            apply(&tx, op, now)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    fn notify(&self, touched: &[CollectionPath]) {
        let mut listeners = self.listeners.borrow_mut();
        let mut closed = Vec::new();

        for (id, listener) in listeners.entries.iter() {
            if !touched.contains(&listener.collection) {
                continue;
            }
            let event = match read_collection(&self.conn, &listener.collection) {
                Ok(documents) => SnapshotEvent::Snapshot(documents),
                Err(err) => {
                    warn!("event=snapshot_failed collection={} error={}", listener.collection, err);
                    SnapshotEvent::Failed(err.to_string())
                }
            };
            if listener.sender.send(event).is_err() {
                closed.push(*id);
            }
        }

        for id in closed {
            listeners.entries.remove(&id);
        }
    }
}

impl DocumentStore for SqliteStore {
    fn create(&self, collection: &CollectionPath, data: Fields) -> Result<String> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let body = serde_json::to_string(&data)?;
        let now = Utc::now().timestamp();
        self.conn
            .execute(
                "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                params![collection.as_str(), id, body, now],
            )
            .map_err(|err| write_failed(err.into()))?;
        debug!("event=document_create collection={} id={}", collection, id);
        self.notify(&[collection.clone()]);
        Ok(id)
    }

    fn set(&self, collection: &CollectionPath, id: &str, data: Fields, mode: SetMode) -> Result<()> {
        let op = BatchOp::Set {
            collection: collection.clone(),
            id: id.to_string(),
            data,
            mode,
        };
        apply(&self.conn, &op, Utc::now().timestamp()).map_err(write_failed)?;
        debug!("event=document_set collection={} id={} mode={:?}", collection, id, mode);
        self.notify(&[collection.clone()]);
        Ok(())
    }

    fn delete(&self, collection: &CollectionPath, id: &str) -> Result<()> {
        let op = BatchOp::Delete {
            collection: collection.clone(),
            id: id.to_string(),
        };
        apply(&self.conn, &op, Utc::now().timestamp()).map_err(write_failed)?;
        debug!("event=document_delete collection={} id={}", collection, id);
        self.notify(&[collection.clone()]);
        Ok(())
    }

    fn list(&self, collection: &CollectionPath) -> Result<Vec<Document>> {
        read_collection(&self.conn, collection)
    }

    fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription> {
        let documents =
            read_collection(&self.conn, collection).map_err(|err| Error::SubscriptionFailure(err.to_string()))?;

        let (sender, receiver) = mpsc::channel();
        // The receiver is alive, so the initial send cannot fail.
        let _ = sender.send(SnapshotEvent::Snapshot(documents));

        let id = {
            let mut listeners = self.listeners.borrow_mut();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.insert(
                id,
                Listener {
                    collection: collection.clone(),
                    sender,
                },
            );
            id
        };
        debug!("event=subscribe collection={} listener={}", collection, id);

        let registry = Rc::downgrade(&self.listeners);
        Ok(Subscription::new(receiver, move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().entries.remove(&id);
            }
        }))
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        self.apply_batch(&batch, Utc::now().timestamp()).map_err(write_failed)?;

        let mut touched: Vec<CollectionPath> = Vec::new();
        for op in batch.ops() {
            if !touched.contains(op.collection()) {
                touched.push(op.collection().clone());
            }
        }
        debug!("event=batch_commit ops={}", batch.ops().len());
        self.notify(&touched);
        Ok(())
    }
}

impl IdentityProvider for SqliteStore {
    fn sign_in_anonymously(&self) -> Result<String> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                params![ANONYMOUS_UID_KEY],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(uid) = existing {
            return Ok(uid);
        }

        let uid = uuid::Uuid::new_v4().simple().to_string();
        self.conn.execute(
            "INSERT INTO metadata (key, value) VALUES (?1, ?2)",
            params![ANONYMOUS_UID_KEY, uid],
        )?;
        info!("event=anonymous_account_created");
        Ok(uid)
    }
}

/// Errors raised while writing reach callers as `WriteFailure`.
fn write_failed(err: Error) -> Error {
    match err {
        Error::WriteFailure(_) => err,
        other => Error::WriteFailure(other.to_string()),
    }
}

fn read_collection(conn: &Connection, collection: &CollectionPath) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY rowid")?;

    let rows = stmt
        .query_map(params![collection.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, data)| {
            let data: Fields = serde_json::from_str(&data)?;
            Ok(Document { id, data })
        })
        .collect()
}

fn read_fields(conn: &Connection, collection: &CollectionPath, id: &str) -> Result<Option<Fields>> {
    let data: Option<String> = conn
        .query_row(
            "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
            |row| row.get(0),
        )
        .optional()?;

    match data {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

fn apply(conn: &Connection, op: &BatchOp, now: i64) -> Result<()> {
    match op {
        BatchOp::Set {
            collection,
            id,
            data,
            mode,
        } => {
            let body = match mode {
                SetMode::Replace => data.clone(),
                SetMode::Merge => {
                    let mut merged = read_fields(conn, collection, id)?.unwrap_or_default();
                    for (key, value) in data {
                        merged.insert(key.clone(), value.clone());
                    }
                    merged
                }
            };
            conn.execute(
                "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
                params![collection.as_str(), id, serde_json::to_string(&body)?, now],
            )?;
        }
        BatchOp::Delete { collection, id } => {
            conn.execute(
                "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
            )?;
        }
    }
    Ok(())
}
