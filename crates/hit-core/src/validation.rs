//! Input validation for point checks.
//!
//! Turns the three raw strings delivered by a transport into a
//! `NormalizedInput`, or into the full list of problems with them.
//!
//! Rules:
//! 1. A missing field is a `MalformedRequest` for that field.
//! 2. `x` accepts `.` or `,` as decimal separator, must be finite and lie in
//!    the closed configured range.
//! 3. `y` and `r` must match a configured allowed value within
//!    [`SET_TOLERANCE`]; the matched allowed value is what gets normalized.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{FieldRule, ValidationError};

/// Tolerance used when matching a parsed value against an allowed set.
pub const SET_TOLERANCE: f64 = 1e-9;

/// The three request fields exactly as the transport decoded them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawInput {
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub r: Option<String>,
}

impl RawInput {
    pub fn new(x: impl Into<String>, y: impl Into<String>, r: impl Into<String>) -> Self {
        Self {
            x: Some(x.into()),
            y: Some(y.into()),
            r: Some(r.into()),
        }
    }

    /// Fill fields absent here from `fallback`.
    pub fn or(self, fallback: RawInput) -> Self {
        Self {
            x: self.x.or(fallback.x),
            y: self.y.or(fallback.y),
            r: self.r.or(fallback.r),
        }
    }
}

/// A triple that satisfies every domain constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedInput {
    pub x: f64,
    pub y: f64,
    pub r: f64,
}

/// Stateless validator built from an `EngineConfig`.
#[derive(Debug, Clone)]
pub struct Validator {
    x_min: f64,
    x_max: f64,
    allowed_y: Vec<f64>,
    allowed_r: Vec<f64>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Validator {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            x_min: config.x_min,
            x_max: config.x_max,
            allowed_y: config.allowed_y.clone(),
            allowed_r: config.allowed_r.clone(),
        }
    }

    /// Validate three present fields.
    pub fn validate(
        &self,
        raw_x: &str,
        raw_y: &str,
        raw_r: &str,
    ) -> Result<NormalizedInput, Vec<ValidationError>> {
        self.validate_fields(Some(raw_x), Some(raw_y), Some(raw_r))
    }

    /// Validate a transport-decoded request, where any field may be absent.
    pub fn validate_input(&self, raw: &RawInput) -> Result<NormalizedInput, Vec<ValidationError>> {
        self.validate_fields(raw.x.as_deref(), raw.y.as_deref(), raw.r.as_deref())
    }

    fn validate_fields(
        &self,
        raw_x: Option<&str>,
        raw_y: Option<&str>,
        raw_r: Option<&str>,
    ) -> Result<NormalizedInput, Vec<ValidationError>> {
        let x = self.check_x(raw_x);
        let y = self.check_y(raw_y);
        let r = self.check_r(raw_r);

        match (x, y, r) {
            (Ok(x), Ok(y), Ok(r)) => Ok(NormalizedInput { x, y, r }),
            (x, y, r) => Err([x.err(), y.err(), r.err()].into_iter().flatten().collect()),
        }
    }

    fn check_x(&self, raw: Option<&str>) -> Result<f64, ValidationError> {
        let raw = raw.ok_or(ValidationError::MalformedRequest { field: "x" })?;
        let invalid = |rule| ValidationError::InvalidX {
            raw: raw.to_string(),
            rule,
        };
        let x = parse_number(raw).ok_or_else(|| invalid(FieldRule::NotANumber))?;
        if (self.x_min..=self.x_max).contains(&x) {
            Ok(x)
        } else {
            Err(invalid(FieldRule::OutOfRange {
                min: self.x_min,
                max: self.x_max,
            }))
        }
    }

    fn check_y(&self, raw: Option<&str>) -> Result<f64, ValidationError> {
        let raw = raw.ok_or(ValidationError::MalformedRequest { field: "y" })?;
        check_member(raw, &self.allowed_y)
            .map_err(|rule| ValidationError::InvalidY { raw: raw.to_string(), rule })
    }

    fn check_r(&self, raw: Option<&str>) -> Result<f64, ValidationError> {
        let raw = raw.ok_or(ValidationError::MalformedRequest { field: "r" })?;
        check_member(raw, &self.allowed_r)
            .map_err(|rule| ValidationError::InvalidR { raw: raw.to_string(), rule })
    }
}

fn check_member(raw: &str, allowed: &[f64]) -> Result<f64, FieldRule> {
    let value = parse_number(raw).ok_or(FieldRule::NotANumber)?;
    match_allowed(value, allowed).ok_or_else(|| FieldRule::NotAllowed {
        allowed: format_set(allowed),
    })
}

/// Parse a finite real, accepting `,` as the decimal separator.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn match_allowed(value: f64, allowed: &[f64]) -> Option<f64> {
    allowed
        .iter()
        .copied()
        .find(|candidate| (candidate - value).abs() < SET_TOLERANCE)
}

fn format_set(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(f64::to_string).collect();
    format!("{{{}}}", items.join(", "))
}
