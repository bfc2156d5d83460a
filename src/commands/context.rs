//! Per-Connection State
//!
//! Each connection owns one [`ConnectionContext`]: the database it has
//! selected and its transaction, if one is open.
//!
//! ## Transaction States
//!
//! ```text
//!            MULTI                    EXEC / DISCARD / malformed EXEC
//!   Idle ───────────> Queuing ─────────────────────────────────────> Idle
//!                      │   ▲
//!  rejected command    │   │  QUEUED
//!                      ▼   │
//!                   Queuing (poisoned)
//! ```
//!
//! The queue lives inside the `Queuing` state, so a non-empty queue outside a
//! transaction cannot be represented.

use crate::commands::{Command, CommandError};
use crate::storage::DEFAULT_DB_INDEX;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Transaction {
    #[default]
    Idle,
    Queuing {
        queue: Vec<Command>,
        poisoned: bool,
    },
}

/// State owned by a single client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    db_index: usize,
    transaction: Transaction,
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionContext {
    /// Creates the context for a newly accepted connection.
    pub fn new() -> Self {
        Self {
            db_index: DEFAULT_DB_INDEX,
            transaction: Transaction::Idle,
        }
    }

    /// Index of the selected database.
    pub fn db_index(&self) -> usize {
        self.db_index
    }

    pub(crate) fn set_db_index(&mut self, index: usize) {
        self.db_index = index;
    }

    /// Returns true while a MULTI is open.
    pub fn in_transaction(&self) -> bool {
        matches!(self.transaction, Transaction::Queuing { .. })
    }

    /// Returns true if the open transaction will be rejected at EXEC.
    pub fn is_poisoned(&self) -> bool {
        matches!(self.transaction, Transaction::Queuing { poisoned: true, .. })
    }

    /// Number of commands waiting for EXEC.
    pub fn queued(&self) -> usize {
        match &self.transaction {
            Transaction::Queuing { queue, .. } => queue.len(),
            Transaction::Idle => 0,
        }
    }

    /// Opens a transaction.
    ///
    /// Nesting is an error and leaves the open transaction untouched.
    pub fn begin_transaction(&mut self) -> Result<(), CommandError> {
        if self.in_transaction() {
            return Err(CommandError::MultiCommandNested);
        }
        self.transaction = Transaction::Queuing {
            queue: Vec::new(),
            poisoned: false,
        };
        Ok(())
    }

    /// Appends a command to the open transaction.
    ///
    /// Returns the command back if no transaction is open.
    pub fn enqueue(&mut self, command: Command) -> Result<(), Command> {
        match &mut self.transaction {
            Transaction::Queuing { queue, .. } => {
                queue.push(command);
                Ok(())
            }
            Transaction::Idle => Err(command),
        }
    }

    /// Marks the open transaction for rejection. No effect when idle.
    pub fn poison(&mut self) {
        if let Transaction::Queuing { poisoned, .. } = &mut self.transaction {
            *poisoned = true;
        }
    }

    /// Closes the transaction for EXEC and hands back its queue.
    ///
    /// The context is idle afterwards whatever the outcome.
    pub fn take_transaction(&mut self) -> Result<Vec<Command>, CommandError> {
        match std::mem::take(&mut self.transaction) {
            Transaction::Idle => Err(CommandError::ExecWithoutMulti),
            Transaction::Queuing { poisoned: true, .. } => Err(CommandError::TransactionAborted),
            Transaction::Queuing { queue, .. } => Ok(queue),
        }
    }

    /// Drops the open transaction for DISCARD.
    pub fn discard_transaction(&mut self) -> Result<(), CommandError> {
        match std::mem::take(&mut self.transaction) {
            Transaction::Idle => Err(CommandError::DiscardWithoutMulti),
            Transaction::Queuing { .. } => Ok(()),
        }
    }

    /// Returns to idle, dropping any queue and poison flag.
    pub fn reset_transaction(&mut self) {
        self.transaction = Transaction::Idle;
    }
}
