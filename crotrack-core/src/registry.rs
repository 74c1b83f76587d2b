use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A registered client book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookEntry {
    /// Path to the book file
    pub path: String,
    /// Description of the book
    pub description: String,
}

/// Registry of all known client books
#[derive(Debug, Serialize, Deserialize)]
pub struct Registry {
    pub books: HashMap<String, BookEntry>,
    /// Optional default book name
    pub default_book: Option<String>,
}

impl Registry {
    /// Loads the registry from the provided path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read registry file: {:?}", path.as_ref()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse registry file: {:?}", path.as_ref()))
    }

    /// Gets a book by name
    pub fn get_book(&self, name: &str) -> Option<&BookEntry> {
        self.books.get(name)
    }

    /// Lists all book names
    pub fn list_books(&self) -> Vec<&str> {
        self.books.keys().map(|k| k.as_str()).collect()
    }

    /// Registers a new book or updates an existing one
    pub fn register_book(&mut self, name: String, path: String, description: String) {
        let entry = BookEntry { path, description };

        self.books.insert(name, entry);
    }

    /// Sets a book as the default
    pub fn set_default_book(&mut self, name: &str) -> Result<()> {
        if !self.books.contains_key(name) {
            anyhow::bail!("Book '{}' not found in registry", name);
        }

        self.default_book = Some(name.to_string());

        Ok(())
    }

    /// Clears the default book setting
    pub fn clear_default_book(&mut self) {
        self.default_book = None;
    }

    /// Gets the default book if set
    pub fn get_default_book(&self) -> Option<(&str, &BookEntry)> {
        if let Some(default_name) = &self.default_book {
            if let Some(entry) = self.books.get(default_name) {
                return Some((default_name, entry));
            }
        }
        None
    }

    /// Save the registry to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write registry to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Creates a default registry file if it doesn't exist
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        if path.as_ref().exists() {
            return Ok(());
        }

        let mut books = HashMap::new();
        books.insert(
            "default".to_string(),
            BookEntry {
                path: "clients.yaml".to_string(),
                description: "Default client book".to_string(),
            },
        );

        let registry = Registry {
            books,
            default_book: None,
        };
        let content = serde_yaml::to_string(&registry)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write default registry to {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Gets the path to the registry file
pub fn get_registry_path() -> Result<PathBuf> {
    // Check if CROTRACK_REGISTRY_PATH environment variable is set
    if let Ok(path) = std::env::var("CROTRACK_REGISTRY_PATH") {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.crotrack.config
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".crotrack.config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_default_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.yaml");

        Registry::create_default(&path).unwrap();
        let registry = Registry::load(&path).unwrap();

        assert!(registry.get_book("default").is_some());
        assert!(registry.default_book.is_none());
    }

    #[test]
    fn test_register_and_set_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.yaml");

        let mut registry = Registry {
            books: HashMap::new(),
            default_book: None,
        };
        registry.register_book(
            "lab-a".into(),
            "/data/lab-a.yaml".into(),
            "Lab A pipeline".into(),
        );
        registry.set_default_book("lab-a").unwrap();
        registry.save(&path).unwrap();

        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded.get_default_book().map(|(name, _)| name), Some("lab-a"));
    }

    #[test]
    fn test_set_default_requires_known_book() {
        let mut registry = Registry {
            books: HashMap::new(),
            default_book: None,
        };

        assert!(registry.set_default_book("missing").is_err());
    }
}
