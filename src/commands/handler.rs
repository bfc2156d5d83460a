//! Command Handler Module
//!
//! This module is the single entry point the connection layer calls for each
//! received line. It tokenizes the line, builds a [`Command`], routes it
//! through the connection's transaction state, and executes it against the
//! selected database.
//!
//! ## Supported Commands
//!
//! - `PING` - Test connection
//! - `SELECT index` - Switch to database `index` (0-15)
//! - `SET key value` - Set a key
//! - `GET key` - Get a key's value
//! - `DEL key` - Delete a key
//! - `INCR key` - Increment integer
//! - `INCRBY key increment` - Increment by amount
//! - `MULTI` / `EXEC` / `DISCARD` - Transactions
//! - `COMPACT` - Dump the selected database as SET commands
//! - `DISCONNECT` - Close the connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────┐     │
//! │  │ tokenize() │──>│  build()   │──>│ queue or execute │     │
//! │  └────────────┘   └────────────┘   └────────┬─────────┘     │
//! │                                             │               │
//! │                                             ▼               │
//! │                                     DatabaseRegistry        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::{build, Command, CommandError, ConnectionContext};
use crate::protocol::{tokenize, Reply};
use crate::storage::{Database, DatabaseRegistry, NotAnInteger};
use std::sync::Arc;
use tracing::{debug, trace};

/// What the connection should do after a line has been handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Write the reply and keep reading
    Reply(Reply),
    /// Close the connection without replying
    Close,
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        Response::Reply(reply)
    }
}

impl From<CommandError> for Response {
    fn from(err: CommandError) -> Self {
        Response::Reply(Reply::Error(err))
    }
}

/// Executes commands for one connection against the shared databases.
///
/// Cloning is cheap; every clone sees the same registry.
#[derive(Clone, Debug)]
pub struct CommandHandler {
    registry: Arc<DatabaseRegistry>,
}

impl CommandHandler {
    /// Creates a new command handler over the given databases.
    pub fn new(registry: Arc<DatabaseRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the shared registry.
    pub fn registry(&self) -> &Arc<DatabaseRegistry> {
        &self.registry
    }

    /// Handles one line of client input.
    ///
    /// Errors never escape: each becomes the reply for the line. While a
    /// transaction is open, valid commands other than MULTI, EXEC and
    /// DISCARD are queued instead of run.
    ///
    /// # Example
    ///
    /// ```
    /// use linekv::commands::{CommandHandler, ConnectionContext, Response};
    /// use linekv::storage::DatabaseRegistry;
    /// use std::sync::Arc;
    ///
    /// let handler = CommandHandler::new(Arc::new(DatabaseRegistry::new()));
    /// let mut ctx = ConnectionContext::new();
    ///
    /// let reply = |r: Response| match r {
    ///     Response::Reply(r) => r.to_string(),
    ///     Response::Close => String::from("<closed>"),
    /// };
    ///
    /// assert_eq!(reply(handler.handle_line("SET foo bar", &mut ctx)), "OK");
    /// assert_eq!(reply(handler.handle_line("GET foo", &mut ctx)), "\"bar\"");
    /// ```
    pub fn handle_line(&self, line: &str, ctx: &mut ConnectionContext) -> Response {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!(error = %e, "Rejected malformed line");
                return CommandError::from(e).into();
            }
        };

        let command = match build(tokens, ctx) {
            Ok(command) => command,
            Err(e) => {
                debug!(error = %e, poisoned = ctx.is_poisoned(), "Rejected command");
                return e.into();
            }
        };

        if command == Command::Disconnect {
            return Response::Close;
        }

        let command = if command.is_transaction_control() {
            command
        } else {
            let name = command.name();
            match ctx.enqueue(command) {
                Ok(()) => {
                    trace!(command = name, queued = ctx.queued(), "Queued command");
                    return Reply::Queued.into();
                }
                // No transaction open
                Err(command) => command,
            }
        };

        self.execute(command, ctx).into()
    }

    /// Executes a single command immediately.
    pub fn execute(&self, command: Command, ctx: &mut ConnectionContext) -> Reply {
        trace!(command = command.name(), db = ctx.db_index(), "Executing command");

        match command {
            Command::Ping => Reply::Pong,
            Command::Select { index } => self.cmd_select(&index, ctx),
            Command::Set { key, value } => {
                self.db(ctx).set(key, value);
                Reply::Ok
            }
            Command::Get { key } => match self.db(ctx).get(&key) {
                Ok(value) => Reply::Value(value),
                Err(_) => Reply::Nil,
            },
            Command::Del { key } => Reply::Integer(self.db(ctx).delete(&key) as i64),
            Command::Incr { key } => integer_reply(self.db(ctx).incr(&key)),
            Command::IncrBy { key, delta } => integer_reply(self.db(ctx).incr_by(&key, &delta)),
            Command::Multi => match ctx.begin_transaction() {
                Ok(()) => Reply::Ok,
                Err(e) => e.into(),
            },
            Command::Exec => self.cmd_exec(ctx),
            Command::Discard => match ctx.discard_transaction() {
                Ok(()) => Reply::Ok,
                Err(e) => e.into(),
            },
            Command::Compact => match self.db(ctx).snapshot() {
                Some(entries) => Reply::Entries(entries.into_iter().collect()),
                None => Reply::Nil,
            },
            // Only reachable from a direct call; handle_line closes instead
            Command::Disconnect => Reply::Ok,
        }
    }

    /// The database the connection has selected.
    fn db(&self, ctx: &ConnectionContext) -> Arc<Database> {
        self.registry.database(ctx.db_index())
    }

    /// SELECT index
    fn cmd_select(&self, index: &str, ctx: &mut ConnectionContext) -> Reply {
        let index: i64 = match index.parse() {
            Ok(i) => i,
            Err(_) => return CommandError::ValueNotInteger.into(),
        };

        match self.registry.select(index) {
            Ok(_) => {
                // select() has validated the range
                ctx.set_db_index(index as usize);
                Reply::Ok
            }
            Err(e) => CommandError::from(e).into(),
        }
    }

    /// EXEC
    fn cmd_exec(&self, ctx: &mut ConnectionContext) -> Reply {
        let queue = match ctx.take_transaction() {
            Ok(queue) => queue,
            Err(e) => return e.into(),
        };

        if queue.is_empty() {
            return Reply::EmptyArray;
        }

        debug!(commands = queue.len(), "Executing transaction");
        let replies = queue
            .into_iter()
            .map(|command| self.execute(command, ctx))
            .collect();
        Reply::Batch(replies)
    }
}

fn integer_reply(result: Result<i64, NotAnInteger>) -> Reply {
    match result {
        Ok(n) => Reply::Integer(n),
        Err(e) => CommandError::from(e).into(),
    }
}
