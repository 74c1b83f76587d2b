//! Authentication boundary.
//!
//! The core only ever sees a minimal `AuthenticatedUser` value; whatever
//! identity provider sits behind the trait keeps its own user shape to
//! itself. Every sync operation re-checks `current_user()`, so signing out
//! takes effect on the next operation without further coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Minimal identity the core needs about the signed-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
}

/// Listener invoked whenever the auth state changes
pub type AuthListener = Box<dyn Fn(Option<AuthenticatedUser>) + Send + Sync>;

/// What the core requires from an identity provider
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, or `None`
    fn current_user(&self) -> Option<AuthenticatedUser>;

    /// Registers a listener for auth state changes
    fn subscribe(&self, listener: AuthListener);

    /// Signs the current user out
    fn sign_out(&self);
}

/// Reads the operator identity from the environment (`CROTRACK_USER_EMAIL`).
///
/// The id is generated once per process; it only needs to be stable within
/// a session.
pub struct EnvAuthProvider {
    id: Uuid,
    signed_out: AtomicBool,
    listeners: Mutex<Vec<AuthListener>>,
}

impl EnvAuthProvider {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            signed_out: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        }
    }
}

impl Default for EnvAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for EnvAuthProvider {
    fn current_user(&self) -> Option<AuthenticatedUser> {
        if self.signed_out.load(Ordering::SeqCst) {
            return None;
        }
        let email = std::env::var("CROTRACK_USER_EMAIL").ok()?;
        if email.trim().is_empty() {
            return None;
        }
        Some(AuthenticatedUser {
            id: self.id,
            email,
        })
    }

    fn subscribe(&self, listener: AuthListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn sign_out(&self) {
        self.signed_out.store(true, Ordering::SeqCst);
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(None);
        }
    }
}

/// In-memory provider for tests and embedding
pub struct MemoryAuthProvider {
    user: Mutex<Option<AuthenticatedUser>>,
    listeners: Mutex<Vec<AuthListener>>,
}

impl MemoryAuthProvider {
    /// Creates a provider with nobody signed in
    pub fn new() -> Self {
        Self {
            user: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Creates a provider with the given user already signed in
    pub fn signed_in(email: &str) -> Self {
        let provider = Self::new();
        provider.sign_in(AuthenticatedUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
        });
        provider
    }

    /// Signs a user in and notifies listeners
    pub fn sign_in(&self, user: AuthenticatedUser) {
        *self.user.lock().unwrap() = Some(user.clone());
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(Some(user.clone()));
        }
    }
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for MemoryAuthProvider {
    fn current_user(&self) -> Option<AuthenticatedUser> {
        self.user.lock().unwrap().clone()
    }

    fn subscribe(&self, listener: AuthListener) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn sign_out(&self) {
        *self.user.lock().unwrap() = None;
        let listeners = self.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_memory_provider_sign_in_and_out() {
        let provider = MemoryAuthProvider::new();
        assert!(provider.current_user().is_none());

        provider.sign_in(AuthenticatedUser {
            id: Uuid::new_v4(),
            email: "jane@lab.example".into(),
        });
        assert_eq!(
            provider.current_user().map(|u| u.email),
            Some("jane@lab.example".to_string())
        );

        provider.sign_out();
        assert!(provider.current_user().is_none());
    }

    #[test]
    fn test_listeners_fire_on_change() {
        let provider = MemoryAuthProvider::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        provider.subscribe(Box::new(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));

        provider.sign_in(AuthenticatedUser {
            id: Uuid::new_v4(),
            email: "jane@lab.example".into(),
        });
        provider.sign_out();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
