use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ClientBook;

/// Handles saving and loading the client book from disk with file locking
/// for rudimentary multi-user support
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("yaml.lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    /// Returns the path to the storage file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Acquire an exclusive lock on the file for writing
    /// Returns the lock file handle which must be held during the operation
    fn acquire_write_lock(&self) -> Result<File> {
        // Create parent directories if needed
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to create lock file: {:?}", self.lock_file_path))?;

        // Try to acquire exclusive lock with timeout
        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        loop {
            match FileExt::try_lock_exclusive(&lock_file) {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another user may be editing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Acquire a shared lock on the file for reading
    fn acquire_read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))?;

        // Try to acquire shared lock with timeout
        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(5);

        loop {
            match FileExt::try_lock_shared(&lock_file) {
                Ok(()) => return Ok(Some(lock_file)),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > timeout {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another user may be editing: {:?}",
                            self.file_path
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to acquire lock on {:?}", self.lock_file_path)
                    })
                }
            }
        }
    }

    /// Loads the client book from the YAML file with file locking
    pub fn load(&self) -> Result<ClientBook> {
        // Create the file if it doesn't exist
        if !self.file_path.exists() {
            let default_book = ClientBook::new();
            self.save(&default_book)?;
            return Ok(default_book);
        }

        // Acquire shared lock for reading
        let _lock = self.acquire_read_lock()?;

        // Open and read the file
        let file = File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
        let reader = BufReader::new(file);

        // Parse the YAML content
        let book: ClientBook = serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))?;

        Ok(book)
    }

    /// Saves the client book to the YAML file with file locking
    pub fn save(&self, book: &ClientBook) -> Result<()> {
        // Create parent directories if they don't exist
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Acquire exclusive lock for writing
        let mut lock_file = self.acquire_write_lock()?;

        // Write lock holder info (optional, for debugging)
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        // Serialize and write to file
        let yaml = serde_yaml::to_string(book)?;
        fs::write(&self.file_path, yaml)?;

        // Lock is automatically released when lock_file is dropped
        Ok(())
    }

    /// Reload the file from disk, detecting external changes via the
    /// version stamp.
    /// Returns (book, changed) where changed indicates an external write
    pub fn reload_if_changed(&self, current_book: &ClientBook) -> Result<(ClientBook, bool)> {
        let new_book = self.load()?;
        let changed = new_book.version != current_book.version;
        Ok((new_book, changed))
    }

    /// Perform an atomic update operation with proper locking
    /// This reloads the file, applies changes, and saves atomically
    pub fn update_atomically<F>(&self, update_fn: F) -> Result<ClientBook>
    where
        F: FnOnce(&mut ClientBook),
    {
        // Acquire exclusive lock
        let mut lock_file = self.acquire_write_lock()?;

        // Write lock holder info
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        // Load latest version from disk
        let mut book = if self.file_path.exists() {
            let file = File::open(&self.file_path)
                .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
            let reader = BufReader::new(file);
            serde_yaml::from_reader(reader)
                .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))?
        } else {
            ClientBook::new()
        };

        // Apply the update
        update_fn(&mut book);

        // Save back
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(&book)?;
        fs::write(&self.file_path, yaml)?;

        // Lock is released when lock_file is dropped
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;
    use tempfile::TempDir;

    #[test]
    fn test_load_creates_default_book() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("clients.yaml"));

        let book = storage.load().unwrap();

        assert!(book.clients.is_empty());
        assert_eq!(book.version, 0);
        assert!(storage.path().exists());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("clients.yaml"));

        let mut book = ClientBook::new();
        book.clients.push(Client::new("Acme".into()));
        book.modified_by = "jane@lab.example".into();
        book.version = 3;
        storage.save(&book).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.clients.len(), 1);
        assert_eq!(loaded.clients[0].name, "Acme");
        assert_eq!(loaded.modified_by, "jane@lab.example");
        assert_eq!(loaded.version, 3);
    }

    #[test]
    fn test_reload_if_changed_uses_version_stamp() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("clients.yaml"));

        let book = storage.load().unwrap();
        let (_, changed) = storage.reload_if_changed(&book).unwrap();
        assert!(!changed);

        let mut newer = book.clone();
        newer.version = 1;
        storage.save(&newer).unwrap();

        let (reloaded, changed) = storage.reload_if_changed(&book).unwrap();
        assert!(changed);
        assert_eq!(reloaded.version, 1);
    }

    #[test]
    fn test_update_atomically() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("clients.yaml"));
        storage.load().unwrap();

        let updated = storage
            .update_atomically(|book| {
                book.clients.push(Client::new("Globex".into()));
                book.version += 1;
            })
            .unwrap();

        assert_eq!(updated.clients.len(), 1);
        assert_eq!(storage.load().unwrap().version, 1);
    }
}
