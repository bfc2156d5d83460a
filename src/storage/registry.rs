//! Logical Database Registry
//!
//! Maps database indexes (0–15) to their [`Database`]. A database comes into
//! existence the first time any connection selects its index and is then
//! shared by every connection that selects it, for the life of the process.
//! Index 0 exists from the start because every connection begins there.

use crate::storage::{Database, DatabaseStats};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Number of logical databases.
pub const NUM_DATABASES: usize = 16;

/// Index every connection starts on.
pub const DEFAULT_DB_INDEX: usize = 0;

/// Raised when an index falls outside `0..NUM_DATABASES`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("DB index {0} is out of range")]
pub struct IndexOutOfRange(pub i64);

/// Owns the lazily created databases.
#[derive(Debug)]
pub struct DatabaseRegistry {
    databases: RwLock<HashMap<usize, Arc<Database>>>,
}

impl Default for DatabaseRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseRegistry {
    /// Creates a registry holding only the default database.
    pub fn new() -> Self {
        let mut databases = HashMap::new();
        databases.insert(DEFAULT_DB_INDEX, Arc::new(Database::new()));
        Self {
            databases: RwLock::new(databases),
        }
    }

    /// Validates `index` and returns its database, creating it if needed.
    pub fn select(&self, index: i64) -> Result<Arc<Database>, IndexOutOfRange> {
        let slot = usize::try_from(index)
            .ok()
            .filter(|&i| i < NUM_DATABASES)
            .ok_or(IndexOutOfRange(index))?;
        Ok(self.database(slot))
    }

    /// Returns the database at an already validated index, creating it if
    /// needed.
    pub(crate) fn database(&self, index: usize) -> Arc<Database> {
        debug_assert!(index < NUM_DATABASES);

        // Fast path: the database already exists
        if let Some(db) = self.databases.read().get(&index) {
            return Arc::clone(db);
        }

        // Another connection may have created it between the two locks
        let mut databases = self.databases.write();
        let db = databases.entry(index).or_insert_with(|| {
            debug!(db = index, "Created database");
            Arc::new(Database::new())
        });
        Arc::clone(db)
    }

    /// Returns true if the database at `index` has been created.
    pub fn contains(&self, index: usize) -> bool {
        self.databases.read().contains_key(&index)
    }

    /// Returns the indexes of all created databases, ascending.
    pub fn indexes(&self) -> Vec<usize> {
        let mut indexes: Vec<usize> = self.databases.read().keys().copied().collect();
        indexes.sort_unstable();
        indexes
    }

    /// Returns counters for every created database, by ascending index.
    pub fn stats(&self) -> Vec<(usize, DatabaseStats)> {
        let mut stats: Vec<_> = self
            .databases
            .read()
            .iter()
            .map(|(&index, db)| (index, db.stats()))
            .collect();
        stats.sort_unstable_by_key(|&(index, _)| index);
        stats
    }
}
