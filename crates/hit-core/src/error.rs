//! Error taxonomy for the hitcheck engine.

use std::fmt;

use hit_ledger::LedgerError;

/// The rule a rejected field broke.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRule {
    /// The value did not parse as a finite number.
    NotANumber,
    /// The value parsed but lies outside the closed range.
    OutOfRange { min: f64, max: f64 },
    /// The value parsed but matches no member of the allowed set.
    NotAllowed { allowed: String },
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::NotANumber => f.write_str("must be a number"),
            FieldRule::OutOfRange { min, max } => write!(f, "must be between {min} and {max}"),
            FieldRule::NotAllowed { allowed } => write!(f, "must be one of {allowed}"),
        }
    }
}

/// A single rejected input field.
///
/// Validation never short-circuits: callers receive every violation of a
/// request at once, ordered x, y, r.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("parameter x {rule}, got {raw:?}")]
    InvalidX { raw: String, rule: FieldRule },

    #[error("parameter y {rule}, got {raw:?}")]
    InvalidY { raw: String, rule: FieldRule },

    #[error("parameter r {rule}, got {raw:?}")]
    InvalidR { raw: String, rule: FieldRule },

    #[error("missing parameter: {field}")]
    MalformedRequest { field: &'static str },
}

impl ValidationError {
    /// Name of the offending request field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidX { .. } => "x",
            ValidationError::InvalidY { .. } => "y",
            ValidationError::InvalidR { .. } => "r",
            ValidationError::MalformedRequest { field } => *field,
        }
    }
}

/// hitcheck errors outside of per-request validation.
#[derive(Debug, thiserror::Error)]
pub enum HitError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for hitcheck operations.
pub type Result<T> = std::result::Result<T, HitError>;
