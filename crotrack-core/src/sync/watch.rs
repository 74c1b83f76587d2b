//! Push-style change subscription over a document store.
//!
//! The underlying stores only expose whole-document reads, so the watcher
//! polls on a background thread and compares the book's version stamp,
//! invoking the callback with the full new book whenever it changes. The
//! current document is delivered once shortly after subscribing, then on
//! every observed change - including changes made by this process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::traits::DocumentStore;
use crate::models::ClientBook;

/// Handle to an active subscription; cancelling (or dropping) stops the
/// background thread
pub struct Subscription {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stops the watcher and waits for its thread to finish
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Starts watching the store, invoking `callback` with the new book on
/// every observed change
pub fn watch<F>(store: Arc<dyn DocumentStore>, interval: Duration, callback: F) -> Subscription
where
    F: Fn(ClientBook) + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut last_version: Option<u64> = None;

        while !stop_flag.load(Ordering::SeqCst) {
            match store.load() {
                Ok(book) => {
                    if last_version != Some(book.version) {
                        last_version = Some(book.version);
                        callback(book);
                    }
                }
                // Read failures are logged and the watcher keeps going;
                // the next successful poll delivers the current state
                Err(e) => log::warn!("Failed to poll document store: {:#}", e),
            }

            // Sleep in short slices so cancellation stays prompt
            let slice = Duration::from_millis(10).min(interval);
            let mut slept = Duration::ZERO;
            while slept < interval && !stop_flag.load(Ordering::SeqCst) {
                thread::sleep(slice);
                slept += slice;
            }
        }
    });

    Subscription {
        stop,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Client;
    use crate::sync::MemoryStore;
    use std::sync::Mutex;

    fn wait_until<F: Fn() -> bool>(cond: F) {
        let start = std::time::Instant::now();
        while !cond() {
            if start.elapsed() > Duration::from_secs(5) {
                panic!("condition not reached in time");
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_watch_delivers_initial_document_and_changes() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let seen: Arc<Mutex<Vec<u64>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let sub = watch(store.clone(), Duration::from_millis(10), move |book| {
            seen_clone.lock().unwrap().push(book.version);
        });

        // Initial empty document (version 0) is delivered
        wait_until(|| !seen.lock().unwrap().is_empty());

        let mut book = ClientBook::new();
        book.clients.push(Client::new("Acme".into()));
        book.version = 1;
        store.save(&book).unwrap();

        wait_until(|| seen.lock().unwrap().contains(&1));
        sub.cancel();

        let versions = seen.lock().unwrap().clone();
        assert_eq!(versions.first(), Some(&0));
        assert!(versions.contains(&1));
    }

    #[test]
    fn test_watch_ignores_unchanged_version() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let count = Arc::new(Mutex::new(0usize));
        let count_clone = count.clone();

        let sub = watch(store.clone(), Duration::from_millis(5), move |_| {
            *count_clone.lock().unwrap() += 1;
        });

        wait_until(|| *count.lock().unwrap() >= 1);
        // Give the watcher a few more polls over the unchanged document
        thread::sleep(Duration::from_millis(50));
        sub.cancel();

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[test]
    fn test_cancel_stops_callbacks() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let count = Arc::new(Mutex::new(0usize));
        let count_clone = count.clone();

        let sub = watch(store.clone(), Duration::from_millis(5), move |_| {
            *count_clone.lock().unwrap() += 1;
        });
        wait_until(|| *count.lock().unwrap() >= 1);
        sub.cancel();

        let mut book = ClientBook::new();
        book.version = 9;
        store.save(&book).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(*count.lock().unwrap(), 1);
    }
}
