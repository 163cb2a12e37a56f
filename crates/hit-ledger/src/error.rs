//! Error types for hit-ledger

use thiserror::Error;

/// Errors that can occur in the history persistence layer
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The backing store refused the append; the record was not published
    #[error("history ledger unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error while opening or replaying a ledger
    #[error("ledger io failed: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted line could not be decoded on replay
    #[error("corrupt ledger entry at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },
}
