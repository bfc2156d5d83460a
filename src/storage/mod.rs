//! Storage Module
//!
//! This module provides the in-memory storage for LineKV: sixteen logical
//! databases, each an independent string-to-string map behind its own
//! read/write lock.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DatabaseRegistry                         │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐     ┌──────────┐    │
//! │  │   db 0   │ │   db 1   │ │  (empty) │ ... │  db 15   │    │
//! │  │  RwLock  │ │  RwLock  │ │          │     │  RwLock  │    │
//! │  └──────────┘ └──────────┘ └──────────┘     └──────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Databases are created on first `SELECT` and never dropped.
//!
//! ## Example
//!
//! ```
//! use linekv::storage::DatabaseRegistry;
//!
//! let registry = DatabaseRegistry::new();
//!
//! let db = registry.select(2).unwrap();
//! db.set("name", "Ada");
//! assert_eq!(registry.select(2).unwrap().get("name").unwrap(), "Ada");
//!
//! assert!(registry.select(16).is_err());
//! ```

pub mod engine;
pub mod registry;

// Re-export commonly used types
pub use engine::{Database, DatabaseStats, NotAnInteger, StoreError, StoreResult};
pub use registry::{DatabaseRegistry, IndexOutOfRange, DEFAULT_DB_INDEX, NUM_DATABASES};
