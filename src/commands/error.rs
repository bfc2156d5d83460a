//! Client-visible command errors.
//!
//! The `Display` form of each variant is the message that follows
//! `(error) ERR ` in the reply. [`CommandError::ExecAbort`] is rendered with
//! the `EXECABORT` prefix instead; see [`crate::protocol::Reply`].

use crate::protocol::TokenizeError;
use crate::storage::{IndexOutOfRange, NotAnInteger};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A malformed line, or a well-formed line naming no known command.
    /// `name` is empty for malformed lines.
    #[error("{}", unknown_command_message(.name, .args))]
    UnknownCommand { name: String, args: Vec<String> },

    #[error("wrong number of arguments for '{0}' command")]
    WrongNumberOfArgs(String),

    #[error("value is not an integer or out of range")]
    ValueNotInteger,

    #[error("DB index is out of range")]
    DbIndexOutOfRange,

    #[error("EXEC without MULTI")]
    ExecWithoutMulti,

    #[error("DISCARD without MULTI")]
    DiscardWithoutMulti,

    #[error("MULTI calls can not be nested")]
    MultiCommandNested,

    #[error("Transaction discarded because of previous errors.")]
    TransactionAborted,

    /// EXEC itself was malformed; the transaction has already been dropped
    #[error("{0}")]
    ExecAbort(Box<CommandError>),
}

impl CommandError {
    /// Error for a line that failed structural validation.
    pub fn malformed() -> Self {
        CommandError::UnknownCommand {
            name: String::new(),
            args: Vec::new(),
        }
    }
}

fn unknown_command_message(name: &str, args: &[String]) -> String {
    if name.is_empty() {
        return "unknown command".to_string();
    }
    let mut message = format!("unknown command '{}', with args beginning with: ", name);
    for arg in args {
        message.push_str(&format!("'{}' ", arg));
    }
    message
}

impl From<TokenizeError> for CommandError {
    fn from(_: TokenizeError) -> Self {
        CommandError::malformed()
    }
}

impl From<IndexOutOfRange> for CommandError {
    fn from(_: IndexOutOfRange) -> Self {
        CommandError::DbIndexOutOfRange
    }
}

impl From<NotAnInteger> for CommandError {
    fn from(_: NotAnInteger) -> Self {
        CommandError::ValueNotInteger
    }
}
