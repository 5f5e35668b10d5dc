use crate::{Error, Result};
use log::debug;
use rusqlite::Connection as SqliteConnection;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub type Connection = SqliteConnection;

/// Newest `metadata.schema_version` this build can read
pub const SCHEMA_VERSION: i32 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the document database lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Database {
    File(PathBuf),
    /// Private to one connection; gone when it closes
    Memory,
}

impl Database {
    pub fn file<P: AsRef<Path>>(path: P) -> Self {
        Database::File(path.as_ref().to_path_buf())
    }

    /// Open a connection, creating the file and schema on first use.
    ///
    /// The schema script is idempotent, so opening an existing database only
    /// checks that its version is one this build understands.
    pub fn open(&self) -> Result<Connection> {
        let conn = match self {
            Database::File(path) => {
                if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = SqliteConnection::open(path)?;
                // Readers in other processes keep working while this one writes.
                let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                debug!("event=db_open path={} journal_mode={}", path.display(), mode);
                conn
            }
            Database::Memory => SqliteConnection::open_in_memory()?,
        };

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(include_str!("../../schema.sql"))?;

        let version = Self::get_schema_version(&conn)?;
        if version > SCHEMA_VERSION {
            return Err(Error::InvalidInput(format!(
                "database schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            )));
        }
        Ok(conn)
    }

    /// Human-readable location for logs
    pub fn location(&self) -> String {
        match self {
            Database::File(path) => path.display().to_string(),
            Database::Memory => ":memory:".to_string(),
        }
    }

    pub fn get_schema_version(conn: &Connection) -> Result<i32> {
        let version: String = conn.query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )?;

        version
            .parse::<i32>()
            .map_err(|_| Error::InvalidInput(format!("Invalid schema version '{}'", version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_file_and_parents() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("stickies.db");

        let conn = Database::file(&db_path).open().unwrap();

        assert!(db_path.exists());
        assert_eq!(Database::get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_keeps_documents() {
        let dir = tempdir().unwrap();
        let db = Database::file(dir.path().join("stickies.db"));

        let conn = db.open().unwrap();
        conn.execute(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES ('c', 'a', '{}', 0, 0)",
            [],
        )
        .unwrap();
        drop(conn);

        let conn = db.open().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let dir = tempdir().unwrap();
        let db = Database::file(dir.path().join("stickies.db"));
        let conn = db.open().unwrap();
        conn.execute("UPDATE metadata SET value = '99' WHERE key = 'schema_version'", [])
            .unwrap();
        drop(conn);

        let err = db.open().unwrap_err();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_memory_database_has_schema() {
        let conn = Database::Memory.open().unwrap();
        assert_eq!(Database::get_schema_version(&conn).unwrap(), 1);
        assert_eq!(Database::Memory.location(), ":memory:");
    }
}
