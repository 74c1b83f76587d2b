//! Synchronization layer for the client book
//!
//! This module bridges the in-memory client list to a multi-user document
//! store through a trait-based backend abstraction (YAML files, SQLite, or
//! in-memory), a poll-based change subscription, and an auth-gated session
//! that owns all remote traffic.

mod memory;
mod migration;
mod session;
mod sqlite_backend;
mod traits;
mod watch;
mod yaml_backend;

pub use memory::MemoryStore;
pub use migration::{import_from_json, migrate_sqlite_to_yaml, migrate_yaml_to_sqlite};
pub use session::SyncSession;
pub use sqlite_backend::SqliteStore;
pub use traits::{BackendType, DocumentStore, StoreConfig, StoreStats};
pub use watch::{watch, Subscription};
pub use yaml_backend::YamlStore;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Creates a document store based on the file extension or explicit type
pub fn create_store(path: &Path, backend_type: Option<BackendType>) -> Result<Arc<dyn DocumentStore>> {
    let bt = backend_type.unwrap_or_else(|| {
        // Infer from file extension
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => BackendType::Yaml,
            Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
            _ => BackendType::Yaml, // Default to YAML
        }
    });

    match bt {
        BackendType::Yaml => Ok(Arc::new(YamlStore::new(path))),
        BackendType::Sqlite => Ok(Arc::new(SqliteStore::new(path)?)),
        BackendType::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
