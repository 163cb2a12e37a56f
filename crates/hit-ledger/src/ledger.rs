//! History ledger contract.
//!
//! The ledger is the only shared mutable state in a hitcheck process. All
//! implementations must uphold the same guarantees:
//! - `append` is atomic: concurrent appends never lose a record, never
//!   interleave partial writes, and never hand out the same position twice.
//! - `snapshot` is a consistent point-in-time copy: a record is visible only
//!   once fully built, and a snapshot never waits behind a stalled appender.
//! - Records are never removed or altered.
//!
//! Contract tests live in `tests/ledger_contracts.rs`.

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::record::{EvaluationRecord, LedgerPosition};

/// Result type for ledger operations
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Append-only, ordered store of evaluation records.
#[async_trait]
pub trait HistoryLedger: Send + Sync {
    /// Append a record and return the position it was assigned.
    async fn append(&self, record: EvaluationRecord) -> LedgerResult<LedgerPosition>;

    /// Copy of every record, oldest first.
    async fn snapshot(&self) -> Vec<EvaluationRecord>;

    /// Copy of the newest `limit` records, oldest first.
    async fn snapshot_tail(&self, limit: usize) -> Vec<EvaluationRecord> {
        let mut records = self.snapshot().await;
        let skip = records.len().saturating_sub(limit);
        records.drain(..skip);
        records
    }

    /// Number of records appended so far.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
