//! hitcheck core library
//!
//! The request-processing engine behind the point-in-area check: validate a
//! raw `(x, y, r)` triple, evaluate the area predicate, append the outcome to
//! the shared history ledger, and assemble the response envelope.

pub mod area;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod metrics;
pub mod obs;
pub mod response;
pub mod telemetry;
pub mod validation;

pub use area::{Area, FnArea, QuadrantArea};
pub use config::EngineConfig;
pub use engine::{CheckEngine, CheckReply, Rejection, RequestStage};
pub use error::{FieldRule, HitError, Result, ValidationError};
pub use merge::{merge_history, RecordKey};
pub use response::{build_response, ResponseEnvelope};
pub use validation::{NormalizedInput, RawInput, Validator};

pub use hit_ledger::file::replay as read_history_file;
pub use hit_ledger::{
    EvaluationRecord, FileHistoryLedger, HistoryLedger, LedgerError, LedgerPosition,
    MemoryHistoryLedger,
};

pub use metrics::METRICS;
pub use telemetry::{init_tracing, LogFormat};

/// hitcheck version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
