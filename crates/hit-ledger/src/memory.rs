//! In-process history ledger backed by a `RwLock<Vec<_>>`.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::ledger::{HistoryLedger, LedgerResult};
use crate::record::{EvaluationRecord, LedgerPosition};

/// Ledger that lives for the lifetime of the process.
///
/// The write lock is held only for the push itself, so readers wait at most
/// one push. Records are fully built before the lock is taken, which means a
/// poisoned lock still guards a consistent vector and is safe to recover.
#[derive(Debug, Default)]
pub struct MemoryHistoryLedger {
    records: RwLock<Vec<EvaluationRecord>>,
}

impl MemoryHistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger with previously recorded history (e.g. a file replay).
    pub fn from_records(records: Vec<EvaluationRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Synchronous append, shared with `FileHistoryLedger`.
    pub(crate) fn push(&self, record: EvaluationRecord) -> LedgerPosition {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let position = LedgerPosition(records.len() as u64);
        records.push(record);
        position
    }

    pub(crate) fn copy_all(&self) -> Vec<EvaluationRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn copy_tail(&self, limit: usize) -> Vec<EvaluationRecord> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let start = records.len().saturating_sub(limit);
        records[start..].to_vec()
    }

    pub(crate) fn count(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl HistoryLedger for MemoryHistoryLedger {
    async fn append(&self, record: EvaluationRecord) -> LedgerResult<LedgerPosition> {
        let position = self.push(record);
        tracing::trace!(position = %position, "record appended");
        Ok(position)
    }

    async fn snapshot(&self) -> Vec<EvaluationRecord> {
        self.copy_all()
    }

    async fn snapshot_tail(&self, limit: usize) -> Vec<EvaluationRecord> {
        self.copy_tail(limit)
    }

    async fn len(&self) -> usize {
        self.count()
    }
}
