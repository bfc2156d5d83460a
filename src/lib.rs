//! # LineKV - A Miniature In-Memory Key-Value Database
//!
//! LineKV is a small key-value server that speaks a plain-text, one command
//! per line protocol modeled on a subset of Redis: strings, integer
//! counters, sixteen logical databases and MULTI/EXEC transactions.
//!
//! ## Features
//!
//! - **Text Protocol**: Type commands straight into `nc` or `telnet`
//! - **Quoted Arguments**: `SET greeting "hello world"`
//! - **Logical Databases**: `SELECT 0`..`SELECT 15`, created on first use
//! - **Transactions**: `MULTI` / `EXEC` / `DISCARD` with abort on bad input
//! - **Async I/O**: Built on Tokio, one task per connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              LineKV                                     │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    │ + Context   │    └──────┬──────┘                  │
//! │                     └─────────────┘           │                         │
//! │                                               ▼                         │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────────┐   │
//! │  │  Tokenizer  │    │             DatabaseRegistry                 │   │
//! │  │             │    │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │  └─────────────┘    │  │  db 0  │ │  db 1  │ │  ...   │ │ db 15  │ │   │
//! │                     │  │ RwLock │ │ RwLock │ │        │ │ RwLock │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use linekv::commands::CommandHandler;
//! use linekv::connection::{handle_connection, ConnectionStats};
//! use linekv::storage::DatabaseRegistry;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Databases are shared by every connection
//!     let registry = Arc::new(DatabaseRegistry::new());
//!     let handler = CommandHandler::new(registry);
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         tokio::spawn(handle_connection(stream, addr, handler.clone(), Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `SELECT index`
//! - `SET key value` / `GET key` / `DEL key`
//! - `INCR key` / `INCRBY key increment`
//! - `MULTI` / `EXEC` / `DISCARD`
//! - `COMPACT` - dump the selected database as replayable `SET` lines
//! - `DISCONNECT` - close the connection
//!
//! ## Module Overview
//!
//! - [`protocol`]: Line tokenizer and reply rendering
//! - [`storage`]: Thread-safe databases and the registry that owns them
//! - [`commands`]: Command builder, transaction state and dispatcher
//! - [`connection`]: Client connection management

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandError, CommandHandler, ConnectionContext, Response};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{tokenize, Reply, TokenizeError};
pub use storage::{Database, DatabaseRegistry};

/// The default port LineKV listens on
pub const DEFAULT_PORT: u16 = 8080;

/// The default host LineKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of LineKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
