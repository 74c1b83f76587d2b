//! YAML file storage backend
//!
//! This backend stores the whole client book in a single YAML file, using
//! the `Storage` implementation with file locking support.

use anyhow::Result;
use std::path::{Path, PathBuf};

use super::traits::{BackendType, DocumentStore};
use crate::models::ClientBook;
use crate::storage::Storage;

/// YAML file backend implementation
pub struct YamlStore {
    storage: Storage,
    path: PathBuf,
}

impl YamlStore {
    /// Creates a new YAML backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }

    /// Gets a reference to the underlying Storage
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl DocumentStore for YamlStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Yaml
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ClientBook> {
        self.storage.load()
    }

    fn save(&self, book: &ClientBook) -> Result<()> {
        self.storage.save(book)
    }

    fn update_atomically<F>(&self, update_fn: F) -> Result<ClientBook>
    where
        F: FnOnce(&mut ClientBook),
    {
        self.storage.update_atomically(update_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_store_create_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("clients.yaml");
        let store = YamlStore::new(&file_path);

        store.create_if_not_exists().unwrap();

        let book = store.load().unwrap();
        assert!(book.clients.is_empty());
        assert_eq!(book.version, 0);
    }

    #[test]
    fn test_yaml_store_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = YamlStore::new(temp_dir.path().join("clients.yaml"));

        let mut book = ClientBook::new();
        book.clients.push(Client::new("Acme".into()));
        book.modified_by = "jane@lab.example".into();
        store.save(&book).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.clients.len(), 1);
        assert_eq!(loaded.modified_by, "jane@lab.example");
    }

    #[test]
    fn test_yaml_store_stats() {
        let temp_dir = TempDir::new().unwrap();
        let store = YamlStore::new(temp_dir.path().join("clients.yaml"));
        store.create_if_not_exists().unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.client_count, 0);
        assert_eq!(stats.backend_type, BackendType::Yaml);
    }
}
