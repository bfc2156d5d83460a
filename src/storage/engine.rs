//! Thread-Safe Key-Value Store
//!
//! This module implements the store behind one logical database. Keys and
//! values are plain strings; integer semantics exist only inside
//! [`Database::incr`] and [`Database::incr_by`], which parse on read and
//! format on write.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Database                   │
//! │  ┌───────────────────────────────────────┐  │
//! │  │   RwLock<HashMap<String, String>>     │  │
//! │  │                                       │  │
//! │  │   get / snapshot      -> read lock    │  │
//! │  │   set / delete / incr -> write lock   │  │
//! │  └───────────────────────────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every operation takes the lock exactly once, so a read-modify-write such
//! as INCR can never interleave with another writer on the same database.
//! The map itself is never handed out.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Errors raised by store lookups.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    /// The key is absent
    #[error("key not found")]
    KeyNotFound,
}

/// Result type for store lookups.
pub type StoreResult<T> = Result<T, StoreError>;

/// Raised by the increment operations when the stored value or the supplied
/// delta is not a base-10 integer, or the result does not fit in 64 bits.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("value is not an integer or out of range")]
pub struct NotAnInteger;

/// Parses a stored value or a client-supplied delta.
fn parse_integer(s: &str) -> Result<i64, NotAnInteger> {
    s.parse::<i64>().map_err(|_| NotAnInteger)
}

/// One logical database.
///
/// Designed to be wrapped in an `Arc` and shared by every connection that has
/// selected the same index.
///
/// # Example
///
/// ```
/// use linekv::storage::Database;
///
/// let db = Database::new();
/// db.set("name", "Ada");
/// assert_eq!(db.get("name").unwrap(), "Ada");
///
/// assert_eq!(db.incr("visits").unwrap(), 1);
/// assert_eq!(db.incr_by("visits", "9").unwrap(), 10);
/// ```
#[derive(Default)]
pub struct Database {
    data: RwLock<HashMap<String, String>>,

    /// Statistics: total read operations
    read_count: AtomicU64,

    /// Statistics: total write operations
    write_count: AtomicU64,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("keys", &self.len())
            .field("read_count", &self.read_count.load(Ordering::Relaxed))
            .field("write_count", &self.write_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Database {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `value`, replacing any previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.data.write().insert(key.into(), value.into());
    }

    /// Returns the value bound to `key`.
    pub fn get(&self, key: &str) -> StoreResult<String> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or(StoreError::KeyNotFound)
    }

    /// Removes `key`.
    ///
    /// Returns `true` if the key existed. A miss leaves the store untouched.
    pub fn delete(&self, key: &str) -> bool {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.data.write().remove(key).is_some()
    }

    /// Increments the integer stored at `key` by one.
    ///
    /// An absent key is created with the value `1`.
    pub fn incr(&self, key: &str) -> Result<i64, NotAnInteger> {
        self.apply_delta(key, 1)
    }

    /// Increments the integer stored at `key` by `delta`.
    ///
    /// The delta is validated before the key is looked at, so a bad delta is
    /// rejected even when the key is absent. An absent key is created with
    /// the value of `delta`.
    pub fn incr_by(&self, key: &str, delta: &str) -> Result<i64, NotAnInteger> {
        let delta = parse_integer(delta)?;
        self.apply_delta(key, delta)
    }

    fn apply_delta(&self, key: &str, delta: i64) -> Result<i64, NotAnInteger> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        let mut data = self.data.write();

        let new_value = match data.get(key) {
            Some(current) => parse_integer(current)?
                .checked_add(delta)
                .ok_or(NotAnInteger)?,
            None => delta,
        };

        data.insert(key.to_owned(), new_value.to_string());
        Ok(new_value)
    }

    /// Returns a copy of every entry, ordered by key.
    ///
    /// Returns `None` when the database holds no keys.
    pub fn snapshot(&self) -> Option<BTreeMap<String, String>> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let data = self.data.read();
        if data.is_empty() {
            return None;
        }
        Some(data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the database holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation counters.
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            keys: self.len(),
            reads: self.read_count.load(Ordering::Relaxed),
            writes: self.write_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counters for one database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    pub keys: usize,
    pub reads: u64,
    pub writes: u64,
}
