//! Document-store abstraction
//!
//! This module defines the core trait every storage backend implements.
//! The whole client book is one logical document: backends only need to
//! read the whole document, replace the whole document, and report basic
//! metadata. There are no partial updates; concurrent writers are
//! last-write-wins.

use anyhow::Result;
use std::path::PathBuf;

use crate::models::ClientBook;

/// Types of document-store backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// YAML file storage (single file, advisory locking)
    Yaml,
    /// SQLite database storage (single-row document table)
    Sqlite,
    /// In-memory storage (tests and embedding)
    Memory,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
            BackendType::Memory => write!(f, "Memory"),
        }
    }
}

/// Configuration for document-store backends
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the store file
    pub path: PathBuf,
    /// Backend type
    pub backend_type: BackendType,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("clients.yaml"),
            backend_type: BackendType::Yaml,
        }
    }
}

/// Core trait for document-store backends
pub trait DocumentStore: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the store file
    fn path(&self) -> &std::path::Path;

    /// Loads the entire client book from the store
    fn load(&self) -> Result<ClientBook>;

    /// Saves the entire client book to the store (whole-document replace)
    fn save(&self, book: &ClientBook) -> Result<()>;

    /// Performs an atomic update operation
    /// Default implementation loads, applies changes, and saves
    fn update_atomically<F>(&self, update_fn: F) -> Result<ClientBook>
    where
        F: FnOnce(&mut ClientBook),
        Self: Sized,
    {
        let mut book = self.load()?;
        update_fn(&mut book);
        self.save(&book)?;
        Ok(book)
    }

    /// Returns true if the store file exists
    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Creates the store with an empty book if it doesn't exist
    fn create_if_not_exists(&self) -> Result<()> {
        if !self.exists() {
            self.save(&ClientBook::new())?;
        }
        Ok(())
    }

    /// Returns statistics about the store
    fn stats(&self) -> Result<StoreStats> {
        let book = self.load()?;
        Ok(StoreStats {
            client_count: book.clients.len(),
            requester_count: book.requester_count(),
            project_count: book.project_count(),
            version: book.version,
            backend_type: self.backend_type(),
        })
    }
}

/// Statistics about a document store
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub client_count: usize,
    pub requester_count: usize,
    pub project_count: usize,
    pub version: u64,
    pub backend_type: BackendType,
}
