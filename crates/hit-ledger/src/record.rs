//! Evaluation record and ledger position types.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Zero-based index assigned to a record when it is appended.
///
/// Positions are strictly increasing and never reused within one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerPosition(pub u64);

impl LedgerPosition {
    pub fn index(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LedgerPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of one successful point check.
///
/// Records are immutable once built and are owned by the ledger after
/// `append`. The wire shape is the one the browser client renders:
/// `{ "x", "y", "r", "hit", "currentTime", "processingTimeMs" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub hit: bool,
    /// Wall-clock time the record was built, millisecond precision.
    #[serde(rename = "currentTime", with = "rfc3339_millis")]
    pub evaluated_at: DateTime<Utc>,
    /// Monotonic time spent validating and evaluating.
    #[serde(rename = "processingTimeMs")]
    pub processing_time_ms: u64,
}

impl EvaluationRecord {
    /// Build a record stamped with the current wall-clock time.
    pub fn new(x: f64, y: f64, r: f64, hit: bool, processing_time_ms: u64) -> Self {
        Self::at(x, y, r, hit, Utc::now(), processing_time_ms)
    }

    /// Build a record with an explicit timestamp, truncated to milliseconds
    /// so that it survives a serialize/deserialize cycle unchanged.
    pub fn at(
        x: f64,
        y: f64,
        r: f64,
        hit: bool,
        evaluated_at: DateTime<Utc>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            x,
            y,
            r,
            hit,
            evaluated_at: evaluated_at.trunc_subsecs(3),
            processing_time_ms,
        }
    }

    /// Timestamp as rendered on the wire.
    pub fn current_time(&self) -> String {
        rfc3339_millis::format(&self.evaluated_at)
    }
}

/// `DateTime<Utc>` as RFC 3339 with millisecond precision and a `Z` marker.
pub mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 14, 12, 30, 5).unwrap()
            + chrono::Duration::microseconds(123_456)
    }

    #[test]
    fn wire_field_names() {
        let record = EvaluationRecord::at(2.0, 1.0, 2.0, false, fixed_time(), 0);
        let json = serde_json::to_value(record).unwrap();

        assert_eq!(json["x"], 2.0);
        assert_eq!(json["hit"], false);
        assert_eq!(json["currentTime"], "2025-09-14T12:30:05.123Z");
        assert_eq!(json["processingTimeMs"], 0);
        assert!(json.get("evaluated_at").is_none());
    }

    #[test]
    fn timestamp_truncated_to_millis() {
        let record = EvaluationRecord::at(0.0, 0.0, 1.0, true, fixed_time(), 3);
        assert_eq!(record.evaluated_at.timestamp_subsec_micros(), 123_000);
    }

    #[test]
    fn deserialize_accepts_offset_timestamps() {
        let json = r#"{"x":-1.5,"y":-2,"r":3,"hit":true,"currentTime":"2025-09-14T15:30:05.123+03:00","processingTimeMs":4}"#;
        let record: EvaluationRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.current_time(), "2025-09-14T12:30:05.123Z");
        assert!(record.hit);
        assert_eq!(record.processing_time_ms, 4);
    }

    #[test]
    fn position_display() {
        assert_eq!(LedgerPosition(42).to_string(), "#42");
        assert_eq!(LedgerPosition(42).index(), 42);
    }
}
