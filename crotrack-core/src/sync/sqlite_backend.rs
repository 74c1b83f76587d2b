//! SQLite document-store backend
//!
//! The client list travels as a single JSON blob in a one-row table, with
//! the last-modified/modified-by/version metadata broken out into columns.
//! This keeps the whole-document-replace contract of the YAML backend
//! while allowing the metadata to be inspected with plain SQL.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{BackendType, DocumentStore};
use crate::models::{Client, ClientBook};
use crate::select::Selection;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// The JSON shape stored in the `body` column
#[derive(Serialize, Deserialize)]
struct BookDocument {
    clients: Vec<Client>,
    #[serde(default)]
    selection: Selection,
}

/// SQLite backend implementation
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Creates a new SQLite backend
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let store = Self {
            path,
            conn: Mutex::new(conn),
        };

        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        // Check current schema version
        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ClientBook> {
        let conn = self.conn.lock().unwrap();

        let row: Option<(String, String, String, i64)> = conn
            .query_row(
                "SELECT body, last_modified, modified_by, version FROM book WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((body, last_modified, modified_by, version)) = row else {
            return Ok(ClientBook::new());
        };

        let document: BookDocument =
            serde_json::from_str(&body).context("Failed to parse book document JSON")?;
        let last_modified = DateTime::parse_from_rfc3339(&last_modified)
            .context("Failed to parse last_modified timestamp")?
            .with_timezone(&Utc);

        Ok(ClientBook {
            clients: document.clients,
            last_modified,
            modified_by,
            version: version as u64,
            selection: document.selection,
        })
    }

    fn save(&self, book: &ClientBook) -> Result<()> {
        let document = BookDocument {
            clients: book.clients.clone(),
            selection: book.selection.clone(),
        };
        let body = serde_json::to_string(&document).context("Failed to serialize book document")?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO book (id, body, last_modified, modified_by, version)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                body,
                book.last_modified.to_rfc3339(),
                book.modified_by,
                book.version as i64
            ],
        )?;
        Ok(())
    }

    /// The store file always exists once the connection is open; report
    /// whether a document has been written
    fn exists(&self) -> bool {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM book", [], |row| row.get::<_, i64>(0))
            .map(|count| count > 0)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Requester;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_store_empty_load() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("clients.db")).unwrap();

        let book = store.load().unwrap();
        assert!(book.clients.is_empty());
        assert!(!store.exists());
    }

    #[test]
    fn test_sqlite_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("clients.db")).unwrap();

        let mut book = ClientBook::new();
        let mut client = Client::new("Acme".into());
        client.requesters.push(Requester::new("Jane".into()));
        book.clients.push(client);
        book.modified_by = "jane@lab.example".into();
        book.version = 7;
        store.save(&book).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.clients.len(), 1);
        assert_eq!(loaded.clients[0].requesters.len(), 1);
        assert_eq!(loaded.modified_by, "jane@lab.example");
        assert_eq!(loaded.version, 7);
        assert!(store.exists());
    }

    #[test]
    fn test_sqlite_store_replace_is_whole_document() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::new(dir.path().join("clients.db")).unwrap();

        let mut first = ClientBook::new();
        first.clients.push(Client::new("Acme".into()));
        first.version = 1;
        store.save(&first).unwrap();

        let mut second = ClientBook::new();
        second.clients.push(Client::new("Globex".into()));
        second.version = 2;
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.clients.len(), 1);
        assert_eq!(loaded.clients[0].name, "Globex");
        assert_eq!(loaded.version, 2);
    }

    #[test]
    fn test_sqlite_store_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clients.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            let mut book = ClientBook::new();
            book.clients.push(Client::new("Acme".into()));
            store.save(&book).unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        assert_eq!(reopened.load().unwrap().clients.len(), 1);
    }
}
