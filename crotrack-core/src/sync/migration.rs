//! Migration utilities for converting between storage backends
//!
//! This module provides functions to migrate the client book between YAML
//! and SQLite backends, plus JSON import for backup/restore interoperability.

use anyhow::{Context, Result};
use std::path::Path;

use super::traits::DocumentStore;
use super::{SqliteStore, YamlStore};
use crate::models::ClientBook;

/// Migrates the book from a YAML file to a SQLite database
///
/// Returns the number of clients migrated
pub fn migrate_yaml_to_sqlite<P1: AsRef<Path>, P2: AsRef<Path>>(
    yaml_path: P1,
    sqlite_path: P2,
) -> Result<usize> {
    let yaml_store = YamlStore::new(yaml_path);
    let sqlite_store = SqliteStore::new(sqlite_path)?;

    let book = yaml_store.load().context("Failed to load YAML book")?;
    let client_count = book.clients.len();

    sqlite_store
        .save(&book)
        .context("Failed to save to SQLite database")?;

    Ok(client_count)
}

/// Migrates the book from a SQLite database to a YAML file
///
/// Returns the number of clients migrated
pub fn migrate_sqlite_to_yaml<P1: AsRef<Path>, P2: AsRef<Path>>(
    sqlite_path: P1,
    yaml_path: P2,
) -> Result<usize> {
    let sqlite_store = SqliteStore::new(sqlite_path)?;
    let yaml_store = YamlStore::new(yaml_path);

    let book = sqlite_store.load().context("Failed to load SQLite book")?;
    let client_count = book.clients.len();

    yaml_store.save(&book).context("Failed to save to YAML file")?;

    Ok(client_count)
}

/// Imports a book from a JSON file into any backend, replacing the
/// backend's current document
pub fn import_from_json<P: AsRef<Path>>(json_path: P, store: &dyn DocumentStore) -> Result<usize> {
    let content = std::fs::read_to_string(&json_path)
        .with_context(|| format!("Failed to read JSON file: {:?}", json_path.as_ref()))?;
    let book: ClientBook = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from {:?}", json_path.as_ref()))?;

    let client_count = book.clients.len();
    store.save(&book).context("Failed to save imported book")?;

    Ok(client_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Client, Requester};
    use tempfile::TempDir;

    fn sample_book() -> ClientBook {
        let mut book = ClientBook::new();
        let mut client = Client::new("Acme".into());
        client.requesters.push(Requester::new("Jane".into()));
        book.clients.push(client);
        book.clients.push(Client::new("Globex".into()));
        book.version = 5;
        book
    }

    #[test]
    fn test_migrate_yaml_to_sqlite_and_back() {
        let dir = TempDir::new().unwrap();
        let yaml_path = dir.path().join("clients.yaml");
        let sqlite_path = dir.path().join("clients.db");

        YamlStore::new(&yaml_path).save(&sample_book()).unwrap();

        let migrated = migrate_yaml_to_sqlite(&yaml_path, &sqlite_path).unwrap();
        assert_eq!(migrated, 2);

        let loaded = SqliteStore::new(&sqlite_path).unwrap().load().unwrap();
        assert_eq!(loaded.clients.len(), 2);
        assert_eq!(loaded.version, 5);

        let round_trip = dir.path().join("round_trip.yaml");
        let back = migrate_sqlite_to_yaml(&sqlite_path, &round_trip).unwrap();
        assert_eq!(back, 2);
        assert_eq!(YamlStore::new(&round_trip).load().unwrap().clients.len(), 2);
    }

    #[test]
    fn test_import_from_json() {
        let dir = TempDir::new().unwrap();
        let json_path = dir.path().join("backup.json");
        std::fs::write(
            &json_path,
            serde_json::to_string_pretty(&sample_book()).unwrap(),
        )
        .unwrap();

        let store = YamlStore::new(dir.path().join("clients.yaml"));
        let imported = import_from_json(&json_path, &store).unwrap();

        assert_eq!(imported, 2);
        assert_eq!(store.load().unwrap().clients[0].name, "Acme");
    }
}
