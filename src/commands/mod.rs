//! Command Module
//!
//! This module implements the command engine for LineKV. It receives raw
//! lines, validates and types them, keeps each connection's transaction
//! state, and executes commands against the storage.
//!
//! ## Architecture
//!
//! ```text
//! Client line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │   Tokenizer     │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌───────────────────┐
//! │ Command builder │────>│ ConnectionContext │
//! └────────┬────────┘     │  (transaction)    │
//!          │              └───────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │DatabaseRegistry │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`, `SELECT`
//! - `SET`, `GET`, `DEL`, `INCR`, `INCRBY`
//! - `MULTI`, `EXEC`, `DISCARD`
//! - `COMPACT`, `DISCONNECT`

pub mod command;
pub mod context;
pub mod error;
pub mod handler;

// Re-export the main command types
pub use command::{build, Command};
pub use context::ConnectionContext;
pub use error::CommandError;
pub use handler::{CommandHandler, Response};
