//! Line Protocol
//!
//! Clients speak plain text: one command per newline-terminated line, one
//! reply per command.
//!
//! ## Modules
//!
//! - `tokenizer`: Splits and validates an input line
//! - `reply`: The `Reply` enum and its textual rendering
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{tokenize, Reply};
//!
//! let args = tokenize(r#"SET name "Ada Lovelace""#).unwrap();
//! assert_eq!(args[2], "Ada Lovelace");
//!
//! assert_eq!(Reply::Integer(42).to_string(), "(integer) 42");
//! ```

pub mod reply;
pub mod tokenizer;

// Re-export commonly used types for convenience
pub use reply::Reply;
pub use tokenizer::{tokenize, TokenizeError};
