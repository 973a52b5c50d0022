//! Ephemeral session state
//!
//! Two process-wide maps live behind the `SessionStore` trait: login
//! sessions (no expiry) and chef-centre sessions (fixed TTL, checked
//! lazily on access, never by a background sweep). The trait keeps the
//! storage swappable for a shared external store in multi-instance
//! deployments.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A logged-in field agent
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub verificateur_id: i64,
}

/// An active chef-centre supervisory context
#[derive(Debug, Clone)]
pub struct ChefSession {
    pub code_centre: String,
}

/// Token-keyed session storage
pub trait SessionStore<T: Clone + Send + 'static>: Send + Sync {
    /// Store a session under a token, replacing any existing entry
    fn put(&self, token: String, value: T);

    /// Look up a live session; expired entries are dropped on access
    fn get(&self, token: &str) -> Option<T>;

    /// Remove a session. Removing an absent token is a no-op.
    fn remove(&self, token: &str);

    /// Keep only sessions for which the predicate returns true
    fn retain(&self, keep: &dyn Fn(&str, &T) -> bool);
}

struct Entry<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Entry<T> {
    fn expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-memory `SessionStore` over a mutex-guarded map
pub struct MemorySessionStore<T> {
    inner: Mutex<HashMap<String, Entry<T>>>,
    ttl: Option<Duration>,
}

impl<T> MemorySessionStore<T> {
    /// Create a store; `ttl = None` means sessions never expire
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl<T: Clone + Send + 'static> SessionStore<T> for MemorySessionStore<T> {
    fn put(&self, token: String, value: T) {
        let entry = Entry {
            value,
            expires_at: self.ttl.map(|ttl| Instant::now() + ttl),
        };
        if let Ok(mut map) = self.inner.lock() {
            map.insert(token, entry);
        }
    }

    fn get(&self, token: &str) -> Option<T> {
        let mut map = self.inner.lock().ok()?;
        if map.get(token).is_some_and(|e| e.expired()) {
            map.remove(token);
            return None;
        }
        map.get(token).map(|e| e.value.clone())
    }

    fn remove(&self, token: &str) {
        if let Ok(mut map) = self.inner.lock() {
            map.remove(token);
        }
    }

    fn retain(&self, keep: &dyn Fn(&str, &T) -> bool) {
        if let Ok(mut map) = self.inner.lock() {
            map.retain(|token, entry| !entry.expired() && keep(token, &entry.value));
        }
    }
}

/// Generate an opaque session token
pub fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
