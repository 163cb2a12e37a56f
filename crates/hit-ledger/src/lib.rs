//! hit-ledger: history persistence for hitcheck
//!
//! This crate owns the evaluation record and the append-only ledger that
//! every request writes its outcome into.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: ordering, concurrent-append safety, and torn-read freedom.
//!
//! ## Key Components
//!
//! - `EvaluationRecord`: one immutable outcome of a point check
//! - `HistoryLedger`: backend-agnostic append/snapshot contract
//! - `MemoryHistoryLedger`: process-lifetime ledger
//! - `FileHistoryLedger`: JSON-lines ledger that survives restarts

mod error;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod record;

pub use error::LedgerError;
pub use file::FileHistoryLedger;
pub use ledger::{HistoryLedger, LedgerResult};
pub use memory::MemoryHistoryLedger;
pub use record::{EvaluationRecord, LedgerPosition};
