//! Typed Commands
//!
//! [`Command::parse`] turns tokenizer output into a [`Command`], checking the
//! argument count for each command name. [`build`] does the same on behalf of
//! a connection and records the failure against any open transaction.

use crate::commands::{CommandError, ConnectionContext};

/// A validated client command.
///
/// Arguments are kept as the client sent them; numeric arguments are parsed
/// only when the command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Select { index: String },
    Set { key: String, value: String },
    Get { key: String },
    Del { key: String },
    Incr { key: String },
    IncrBy { key: String, delta: String },
    Multi,
    Exec,
    Discard,
    Compact,
    Disconnect,
}

impl Command {
    /// Builds a command from its tokens.
    ///
    /// The command name is matched case-insensitively. Errors carry the name
    /// exactly as the client typed it.
    pub fn parse(tokens: Vec<String>) -> Result<Command, CommandError> {
        let mut tokens = tokens.into_iter();
        let name = match tokens.next() {
            Some(name) => name,
            None => return Err(CommandError::malformed()),
        };
        let args: Vec<String> = tokens.collect();

        let upper = name.to_ascii_uppercase();
        let arity = match expected_arity(&upper) {
            Some(arity) => arity,
            None => return Err(CommandError::UnknownCommand { name, args }),
        };

        if args.len() != arity {
            let err = CommandError::WrongNumberOfArgs(name);
            return Err(if upper == "EXEC" {
                CommandError::ExecAbort(Box::new(err))
            } else {
                err
            });
        }

        let mut args = args.into_iter();
        let mut next = || args.next().unwrap_or_default();

        let command = match upper.as_str() {
            "PING" => Command::Ping,
            "SELECT" => Command::Select { index: next() },
            "SET" => Command::Set {
                key: next(),
                value: next(),
            },
            "GET" => Command::Get { key: next() },
            "DEL" => Command::Del { key: next() },
            "INCR" => Command::Incr { key: next() },
            "INCRBY" => Command::IncrBy {
                key: next(),
                delta: next(),
            },
            "MULTI" => Command::Multi,
            "EXEC" => Command::Exec,
            "DISCARD" => Command::Discard,
            "COMPACT" => Command::Compact,
            // DISCONNECT is the only name left once the arity lookup passed
            _ => Command::Disconnect,
        };

        Ok(command)
    }

    /// Returns the canonical upper-case command name.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Select { .. } => "SELECT",
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::Incr { .. } => "INCR",
            Command::IncrBy { .. } => "INCRBY",
            Command::Multi => "MULTI",
            Command::Exec => "EXEC",
            Command::Discard => "DISCARD",
            Command::Compact => "COMPACT",
            Command::Disconnect => "DISCONNECT",
        }
    }

    /// Returns true for the commands that drive a transaction rather than
    /// being queued by one.
    pub fn is_transaction_control(&self) -> bool {
        matches!(self, Command::Multi | Command::Exec | Command::Discard)
    }
}

/// Number of arguments each command takes, excluding the name.
fn expected_arity(upper: &str) -> Option<usize> {
    let arity = match upper {
        "PING" | "MULTI" | "EXEC" | "DISCARD" | "COMPACT" | "DISCONNECT" => 0,
        "SELECT" | "GET" | "DEL" | "INCR" => 1,
        "SET" | "INCRBY" => 2,
        _ => return None,
    };
    Some(arity)
}

/// Builds a command for a connection.
///
/// A rejected command poisons an open transaction so that the following
/// EXEC fails as a whole. A malformed EXEC ends the transaction at once.
pub fn build(tokens: Vec<String>, ctx: &mut ConnectionContext) -> Result<Command, CommandError> {
    Command::parse(tokens).map_err(|err| {
        match err {
            CommandError::ExecAbort(_) => ctx.reset_transaction(),
            _ => ctx.poison(),
        }
        err
    })
}
