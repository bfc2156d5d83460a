//! Textual Replies
//!
//! Every command produces a [`Reply`]. Its `Display` form is exactly the text
//! written back to the client, without the terminating newline that the
//! connection layer appends.
//!
//! | Reply                  | Rendered as                          |
//! |------------------------|--------------------------------------|
//! | `Ok`                   | `OK`                                 |
//! | `Pong`                 | `PONG`                               |
//! | `Queued`               | `QUEUED`                             |
//! | `Value("bar")`         | `"bar"`                              |
//! | `Integer(5)`           | `(integer) 5`                        |
//! | `Nil`                  | `(nil)`                              |
//! | `EmptyArray`           | `(empty array)`                      |
//! | `Entries([..])`        | one `SET key value` line per entry   |
//! | `Batch([..])`          | `1) ...` / `2) ...` lines            |
//! | `Error(e)`             | `(error) ERR ...`                    |

use crate::commands::CommandError;
use std::fmt;

/// Reply for a missing key or an empty database dump.
pub const NIL: &str = "(nil)";

/// Reply for a successful write or control command.
pub const OK: &str = "OK";

/// Reply for a command accepted into an open transaction.
pub const QUEUED: &str = "QUEUED";

/// Reply to PING.
pub const PONG: &str = "PONG";

/// Reply to EXEC on a transaction with no queued commands.
pub const EMPTY_ARRAY: &str = "(empty array)";

/// A reply to a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Pong,
    Queued,
    /// A stored string, rendered quoted and escaped
    Value(String),
    Integer(i64),
    Nil,
    EmptyArray,
    /// Database dump as `(key, value)` pairs, in key order
    Entries(Vec<(String, String)>),
    /// Results of an executed transaction, in queue order
    Batch(Vec<Reply>),
    Error(CommandError),
}

impl From<CommandError> for Reply {
    fn from(err: CommandError) -> Self {
        Reply::Error(err)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => f.write_str(OK),
            Reply::Pong => f.write_str(PONG),
            Reply::Queued => f.write_str(QUEUED),
            Reply::Value(v) => write!(f, "{:?}", v),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Nil => f.write_str(NIL),
            Reply::EmptyArray => f.write_str(EMPTY_ARRAY),
            Reply::Entries(entries) => {
                if entries.is_empty() {
                    return f.write_str(NIL);
                }
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "SET {} {}", Replayable(key), Replayable(value))?;
                }
                Ok(())
            }
            Reply::Batch(replies) => {
                for (i, reply) in replies.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{}) {}", i + 1, reply)?;
                }
                Ok(())
            }
            Reply::Error(CommandError::ExecAbort(cause)) => write!(
                f,
                "(error) EXECABORT Transaction discarded because of: {}",
                cause
            ),
            Reply::Error(e) => write!(f, "(error) ERR {}", e),
        }
    }
}

/// Writes an argument so the tokenizer reads it back unchanged.
struct Replayable<'a>(&'a str);

impl fmt::Display for Replayable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bare = !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_alphanumeric());
        if bare {
            f.write_str(self.0)
        } else {
            write!(f, "\"{}\"", self.0)
        }
    }
}
