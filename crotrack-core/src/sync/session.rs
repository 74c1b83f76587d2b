//! Auth-gated bridge between the in-memory client list and a document
//! store.
//!
//! The session pushes the full list on every save (last-write-wins, no
//! merge) and replaces local state wholesale when a subscription delivers
//! a remote change. Save failures are logged and swallowed: the in-memory
//! list stays authoritative for rendering regardless of sync success.

use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::traits::DocumentStore;
use super::watch::{watch, Subscription};
use crate::auth::{AuthProvider, AuthenticatedUser};
use crate::models::{Client, ClientBook};
use crate::select::Selection;

/// Owns a document store and an auth provider; all remote traffic goes
/// through here
pub struct SyncSession {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    version: AtomicU64,
    watcher: Mutex<Option<Subscription>>,
}

impl SyncSession {
    /// Creates a session over the given store and auth provider
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            store,
            auth,
            version: AtomicU64::new(0),
            watcher: Mutex::new(None),
        }
    }

    /// The signed-in user, or `None`
    pub fn current_user(&self) -> Option<AuthenticatedUser> {
        self.auth.current_user()
    }

    /// Fetches the current book once.
    ///
    /// Returns `None` when nobody is signed in; there is no offline or
    /// local fallback copy.
    pub fn load(&self) -> Result<Option<ClientBook>> {
        if self.auth.current_user().is_none() {
            return Ok(None);
        }
        let book = self.store.load()?;
        self.version.store(book.version, Ordering::SeqCst);
        Ok(Some(book))
    }

    /// Pushes the full client list plus metadata to the store.
    ///
    /// Skipped (with a debug log) when nobody is signed in or the list is
    /// empty. Failures are logged and swallowed; the caller's in-memory
    /// list remains the source of truth for the session either way.
    pub fn save(&self, clients: &[Client], selection: &Selection) {
        let Some(user) = self.auth.current_user() else {
            log::debug!("Skipping save: no signed-in user");
            return;
        };
        if clients.is_empty() {
            log::debug!("Skipping save: empty client list");
            return;
        }

        let version = self.version.load(Ordering::SeqCst) + 1;
        let book = ClientBook {
            clients: clients.to_vec(),
            last_modified: Utc::now(),
            modified_by: user.email,
            version,
            selection: selection.clone(),
        };

        match self.store.save(&book) {
            Ok(()) => {
                self.version.store(version, Ordering::SeqCst);
                log::debug!("Saved client book version {}", version);
            }
            Err(e) => log::warn!("Failed to save client book: {:#}", e),
        }
    }

    /// Registers a change listener over the store.
    ///
    /// Returns false (and registers nothing) when nobody is signed in.
    /// Any previous subscription of this session is cancelled first; the
    /// owner must call this again after the auth state or the active store
    /// changes.
    pub fn subscribe<F>(&self, interval: Duration, callback: F) -> bool
    where
        F: Fn(ClientBook) + Send + 'static,
    {
        if self.auth.current_user().is_none() {
            return false;
        }
        let subscription = watch(self.store.clone(), interval, callback);
        *self.watcher.lock().unwrap() = Some(subscription);
        true
    }

    /// Cancels the active subscription, if any
    pub fn unsubscribe(&self) {
        self.watcher.lock().unwrap().take();
    }

    /// Tears down the subscription and signs the user out.
    ///
    /// After this, `load` returns `None` and `save` is a no-op: local data
    /// is expected to be dropped rather than kept as an offline copy.
    pub fn sign_out(&self) {
        self.unsubscribe();
        self.auth.sign_out();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryAuthProvider;
    use crate::sync::MemoryStore;
    use std::thread;

    fn session_with(
        store: Arc<dyn DocumentStore>,
        auth: Arc<MemoryAuthProvider>,
    ) -> SyncSession {
        SyncSession::new(store, auth)
    }

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
    fn test_save_requires_signed_in_user() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        let session = session_with(store.clone(), auth);

        session.save(&[Client::new("Acme".into())], &Selection::default());

        assert!(!store.exists());
    }

    #[test]
    fn test_save_skips_empty_list() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryAuthProvider::signed_in("jane@lab.example"));
        let session = session_with(store.clone(), auth);

        session.save(&[], &Selection::default());

        assert!(!store.exists());
    }

    #[test]
    fn test_save_stamps_metadata() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryAuthProvider::signed_in("jane@lab.example"));
        let session = session_with(store.clone(), auth);

        session.save(&[Client::new("Acme".into())], &Selection::default());
        session.save(&[Client::new("Acme".into())], &Selection::default());

        let book = store.load().unwrap();
        assert_eq!(book.modified_by, "jane@lab.example");
        assert_eq!(book.version, 2);
    }

    #[test]
    fn test_load_none_when_signed_out() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        let session = session_with(store, auth);

        assert!(session.load().unwrap().is_none());
    }

    #[test]
    fn test_version_continues_from_loaded_book() {
        let mut book = ClientBook::new();
        book.clients.push(Client::new("Acme".into()));
        book.version = 41;
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::with_book(book));
        let auth = Arc::new(MemoryAuthProvider::signed_in("jane@lab.example"));
        let session = session_with(store.clone(), auth);

        session.load().unwrap().unwrap();
        session.save(&[Client::new("Acme".into())], &Selection::default());

        assert_eq!(store.load().unwrap().version, 42);
    }

    /// Local mutation produces L1; before it is persisted, another user's
    /// L2 arrives through the subscription. The last callback to run wins
    /// and the displayed state equals L2 - the no-merge policy.
    #[test]
    fn test_concurrent_remote_overwrite_wins() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryAuthProvider::signed_in("jane@lab.example"));
        let session = session_with(store.clone(), auth);

        // Displayed state, replaced wholesale by subscription callbacks
        let displayed: Arc<Mutex<Vec<Client>>> = Arc::new(Mutex::new(Vec::new()));
        let displayed_clone = displayed.clone();
        let subscribed = session.subscribe(Duration::from_millis(5), move |book| {
            *displayed_clone.lock().unwrap() = book.clients;
        });
        assert!(subscribed);

        // Local mutation A produces L1, shown optimistically but not saved
        *displayed.lock().unwrap() = vec![Client::new("Local Edit".into())];

        // Another user saves L2 to the store
        let mut remote = ClientBook::new();
        remote.clients.push(Client::new("Remote Edit".into()));
        remote.version = 1;
        remote.modified_by = "bob@lab.example".into();
        store.save(&remote).unwrap();

        wait_until(|| {
            displayed
                .lock()
                .unwrap()
                .first()
                .map(|c| c.name == "Remote Edit")
                .unwrap_or(false)
        });

        assert_eq!(displayed.lock().unwrap().len(), 1);
        assert_eq!(displayed.lock().unwrap()[0].name, "Remote Edit");
    }

    #[test]
    fn test_subscribe_requires_signed_in_user() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryAuthProvider::new());
        let session = session_with(store, auth);

        assert!(!session.subscribe(Duration::from_millis(5), |_| {}));
    }

    #[test]
    fn test_sign_out_tears_down_subscription() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let auth = Arc::new(MemoryAuthProvider::signed_in("jane@lab.example"));
        let session = session_with(store.clone(), auth);

        let count = Arc::new(Mutex::new(0usize));
        let count_clone = count.clone();
        session.subscribe(Duration::from_millis(5), move |_| {
            *count_clone.lock().unwrap() += 1;
        });
        wait_until(|| *count.lock().unwrap() >= 1);

        session.sign_out();
        let after_sign_out = *count.lock().unwrap();

        let mut book = ClientBook::new();
        book.version = 10;
        store.save(&book).unwrap();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(*count.lock().unwrap(), after_sign_out);
        assert!(session.current_user().is_none());
        assert!(session.load().unwrap().is_none());
    }
}
