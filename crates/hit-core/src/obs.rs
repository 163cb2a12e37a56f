//! Structured observability hooks for the request lifecycle.
//!
//! Every request runs inside a `hitcheck.request` span carrying its
//! request id; the helpers below emit one event per lifecycle step.
//!
//! Events are emitted at `info!`/`debug!` level (filter with `RUST_LOG`).

use hit_ledger::{LedgerError, LedgerPosition};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::RequestStage;

/// Span that scopes all events of one request.
///
/// Attach it with `tracing::Instrument` rather than entering it, since the
/// request future crosses await points.
pub fn request_span(request_id: Uuid) -> tracing::Span {
    tracing::info_span!("hitcheck.request", request_id = %request_id)
}

/// Emit event: the request moved to `stage`.
pub fn emit_stage(stage: RequestStage) {
    debug!(event = "check.stage", stage = stage.as_str());
}

pub fn emit_check_received(x: Option<&str>, y: Option<&str>, r: Option<&str>) {
    debug!(event = "check.received", x = ?x, y = ?y, r = ?r);
}

/// Emit event: validation failed with `error_count` problems.
pub fn emit_check_rejected(error_count: usize) {
    info!(event = "check.rejected", error_count = error_count);
}

/// Emit event: the area predicate was evaluated.
pub fn emit_check_evaluated(x: f64, y: f64, r: f64, hit: bool, processing_time_ms: u64) {
    info!(
        event = "check.evaluated",
        x = x,
        y = y,
        r = r,
        hit = hit,
        processing_time_ms = processing_time_ms,
    );
}

/// Emit event: the record was appended to the ledger.
pub fn emit_check_recorded(position: LedgerPosition) {
    debug!(event = "check.recorded", position = position.index());
}

/// Emit event: the ledger refused an append (warning level).
pub fn emit_ledger_error(error: &LedgerError) {
    warn!(event = "check.ledger_error", error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_span_create() {
        let span = request_span(Uuid::new_v4());
        let _guard = span.enter();
        emit_stage(RequestStage::Received);
    }
}
