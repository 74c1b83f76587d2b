//! In-memory document store, used by tests and as an injectable fake for
//! anything that owns a `SyncSession`.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{BackendType, DocumentStore};
use crate::models::ClientBook;

/// In-memory backend implementation
pub struct MemoryStore {
    book: Mutex<Option<ClientBook>>,
    path: PathBuf,
}

impl MemoryStore {
    /// Creates an empty in-memory store
    pub fn new() -> Self {
        Self {
            book: Mutex::new(None),
            path: PathBuf::from(":memory:"),
        }
    }

    /// Creates a store pre-populated with the given book
    pub fn with_book(book: ClientBook) -> Self {
        Self {
            book: Mutex::new(Some(book)),
            path: PathBuf::from(":memory:"),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ClientBook> {
        let guard = self.book.lock().unwrap();
        Ok(guard.clone().unwrap_or_default())
    }

    fn save(&self, book: &ClientBook) -> Result<()> {
        let mut guard = self.book.lock().unwrap();
        *guard = Some(book.clone());
        Ok(())
    }

    fn exists(&self) -> bool {
        self.book.lock().unwrap().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(!store.exists());
        assert!(store.load().unwrap().clients.is_empty());

        let mut book = ClientBook::new();
        book.clients.push(Client::new("Acme".into()));
        store.save(&book).unwrap();

        assert!(store.exists());
        assert_eq!(store.load().unwrap().clients.len(), 1);
    }

    #[test]
    fn test_memory_store_update_atomically() {
        let store = MemoryStore::new();

        let updated = store
            .update_atomically(|book| {
                book.clients.push(Client::new("Globex".into()));
                book.version += 1;
            })
            .unwrap();

        assert_eq!(updated.version, 1);
        assert_eq!(store.load().unwrap().clients.len(), 1);
    }
}
