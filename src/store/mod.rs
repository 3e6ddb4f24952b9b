//! Durable key/value storage for the offline engine.
//!
//! Values are opaque strings with an optional time-to-live. Clearing a key is
//! an expire-now write, so every backend only has to get `set` right.

mod file;

pub use file::FileStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored entry is unreadable: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Scoped get/set/expire persistence
pub trait DurableStore: Send + Sync {
    /// Read a live value, `None` if absent or expired
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, optionally expiring after `ttl`
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Drop a value
    fn clear(&self, key: &str) -> StoreResult<()> {
        self.set(key, "", Some(Duration::ZERO))
    }
}

/// A stored value with its expiry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn new(value: &str, ttl: Option<Duration>) -> Self {
        // A TTL too large to represent never expires
        let expires_at = ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        Self {
            value: value.to_string(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        match entries.get(key) {
            Some(entry) if entry.is_expired(Utc::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        let entry = Entry::new(value, ttl);
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        if entry.is_expired(Utc::now()) {
            entries.remove(key);
        } else {
            entries.insert(key.to_string(), entry);
        }
        Ok(())
    }
}
