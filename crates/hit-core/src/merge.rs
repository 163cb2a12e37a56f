//! Idempotent history merging.
//!
//! Clients that cache history locally receive overlapping slices of the
//! ledger on every response. Records carry no id, so identity is the tuple
//! `(x, y, r, currentTime, processingTimeMs)`; merging keeps the first
//! occurrence of each key and preserves first-seen order.

use std::collections::HashSet;

use hit_ledger::EvaluationRecord;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical identity tuple of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn of(record: &EvaluationRecord) -> Self {
        let canonical = format!(
            "{}|{}|{}|{}|{}",
            record.x,
            record.y,
            record.r,
            record.current_time(),
            record.processing_time_ms
        );
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        RecordKey(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0[..12])
    }
}

/// Merge `incoming` into `local`, dropping records already present.
///
/// `merge_history(&merge_history(a, b), b) == merge_history(a, b)`.
pub fn merge_history(
    local: &[EvaluationRecord],
    incoming: &[EvaluationRecord],
) -> Vec<EvaluationRecord> {
    let mut seen = HashSet::with_capacity(local.len() + incoming.len());
    local
        .iter()
        .chain(incoming)
        .filter(|record| seen.insert(RecordKey::of(record)))
        .copied()
        .collect()
}
