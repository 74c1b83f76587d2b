use anyhow::Result;
use std::env;
use std::path::PathBuf;

use crate::registry::{get_registry_path, Registry};

/// Determines the client-book file path to use based on the available
/// information
pub fn determine_book_path(book_option: Option<&str>) -> Result<PathBuf> {
    // Check if clients.yaml exists in the current directory - but only if
    // we're not explicitly specifying a book via command line option or
    // environment variable
    let use_local_file = book_option.is_none() && env::var("CROTRACK_BOOK").is_err();
    let current_dir_path = PathBuf::from("clients.yaml");

    if use_local_file && current_dir_path.exists() {
        return Ok(current_dir_path);
    }

    // Get the registry path and ensure it exists
    let registry_path = get_registry_path()?;
    if !registry_path.exists() {
        Registry::create_default(&registry_path)?;
    }

    // Load the registry
    let registry = Registry::load(&registry_path)?;

    // Priority 1: Use the command line book option if provided
    if let Some(book_name) = book_option {
        if let Some(entry) = registry.get_book(book_name) {
            return Ok(PathBuf::from(&entry.path));
        } else {
            anyhow::bail!("Book '{}' not found in registry", book_name);
        }
    }

    // Priority 2: Use the CROTRACK_BOOK environment variable if set
    if let Ok(env_book) = env::var("CROTRACK_BOOK") {
        if let Some(entry) = registry.get_book(&env_book) {
            return Ok(PathBuf::from(&entry.path));
        } else {
            anyhow::bail!("Book '{}' from CROTRACK_BOOK not found in registry", env_book);
        }
    }

    // Priority 3: Check if there's only one book in the registry
    if registry.books.len() == 1 {
        let (_, entry) = registry.books.iter().next().unwrap();
        return Ok(PathBuf::from(&entry.path));
    }

    // Priority 4: Use the default book if configured in registry
    if let Some((_, default_entry)) = registry.get_default_book() {
        return Ok(PathBuf::from(&default_entry.path));
    }

    let mut names = registry.list_books();
    names.sort();
    anyhow::bail!(
        "No book selected - pass --book or set a default. Registered books: {}",
        names.join(", ")
    )
}

/// Lists available books from the registry
pub fn list_available_books() -> Result<Vec<(String, String)>> {
    let registry_path = get_registry_path()?;
    if !registry_path.exists() {
        Registry::create_default(&registry_path)?;
    }

    let registry = Registry::load(&registry_path)?;
    let mut books = Vec::new();

    for (name, entry) in &registry.books {
        books.push((name.clone(), entry.description.clone()));
    }

    Ok(books)
}
