//! Response envelope returned for every request.
//!
//! Wire shape:
//! - ok: `{ "status": "ok", "data": {...}, "history": [...] }`
//! - error: `{ "status": "error", "errors": ["..."], "history": [...] }`
//!
//! `history` is ordered oldest to newest; display order is the client's
//! concern.

use hit_ledger::EvaluationRecord;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResponseEnvelope {
    Ok {
        data: EvaluationRecord,
        history: Vec<EvaluationRecord>,
    },
    Error {
        errors: Vec<String>,
        history: Vec<EvaluationRecord>,
    },
}

/// Assemble the envelope for one request.
///
/// On success `history` must have been taken after the record was appended,
/// so the record is its newest entry. On failure it is taken without
/// appending anything.
pub fn build_response(
    outcome: std::result::Result<EvaluationRecord, Vec<String>>,
    history: Vec<EvaluationRecord>,
) -> ResponseEnvelope {
    match outcome {
        Ok(data) => ResponseEnvelope::Ok { data, history },
        Err(errors) => ResponseEnvelope::Error { errors, history },
    }
}

impl ResponseEnvelope {
    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseEnvelope::Ok { .. })
    }

    pub fn data(&self) -> Option<&EvaluationRecord> {
        match self {
            ResponseEnvelope::Ok { data, .. } => Some(data),
            ResponseEnvelope::Error { .. } => None,
        }
    }

    pub fn errors(&self) -> &[String] {
        match self {
            ResponseEnvelope::Ok { .. } => &[],
            ResponseEnvelope::Error { errors, .. } => errors,
        }
    }

    pub fn history(&self) -> &[EvaluationRecord] {
        match self {
            ResponseEnvelope::Ok { history, .. } | ResponseEnvelope::Error { history, .. } => {
                history
            }
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
