//! Request orchestration.
//!
//! `CheckEngine` walks one request through
//! `Received -> Validated -> Evaluated -> Recorded -> Responded`, or
//! `Received -> Responded` when validation fails. It is the only component
//! that touches shared state, and only through the injected ledger.

use std::sync::Arc;
use std::time::Instant;

use hit_ledger::{EvaluationRecord, HistoryLedger, LedgerError, LedgerPosition};
use tracing::Instrument;
use uuid::Uuid;

use crate::area::{Area, QuadrantArea};
use crate::config::EngineConfig;
use crate::metrics::METRICS;
use crate::obs;
use crate::response::{build_response, ResponseEnvelope};
use crate::validation::{RawInput, Validator};

/// Lifecycle states of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    Validated,
    Evaluated,
    Recorded,
    Responded,
}

impl RequestStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStage::Received => "received",
            RequestStage::Validated => "validated",
            RequestStage::Evaluated => "evaluated",
            RequestStage::Recorded => "recorded",
            RequestStage::Responded => "responded",
        }
    }
}

/// Why a request produced an error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The input failed validation; nothing was recorded.
    Invalid,
    /// The input was valid but the ledger refused the record.
    LedgerUnavailable,
}

/// Envelope plus the facts a transport needs to frame it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReply {
    pub envelope: ResponseEnvelope,
    pub rejection: Option<Rejection>,
    /// Ledger position of the new record, when one was appended.
    pub position: Option<LedgerPosition>,
}

/// Per-request orchestrator. Cheap to clone; clones share the ledger.
#[derive(Clone)]
pub struct CheckEngine {
    validator: Arc<Validator>,
    area: Arc<dyn Area>,
    ledger: Arc<dyn HistoryLedger>,
    history_window: usize,
}

impl CheckEngine {
    /// Engine over `ledger` using the default `QuadrantArea`.
    pub fn new(config: &EngineConfig, ledger: Arc<dyn HistoryLedger>) -> Self {
        Self {
            validator: Arc::new(Validator::from_config(config)),
            area: Arc::new(QuadrantArea),
            ledger,
            history_window: config.history_window,
        }
    }

    /// Swap the membership predicate.
    pub fn with_area(mut self, area: Arc<dyn Area>) -> Self {
        self.area = area;
        self
    }

    pub fn area(&self) -> &dyn Area {
        self.area.as_ref()
    }

    pub fn ledger(&self) -> &Arc<dyn HistoryLedger> {
        &self.ledger
    }

    /// History as included in responses: the whole ledger, or its newest
    /// `history_window` records.
    ///
    /// A window is a view of the ledger at snapshot time, not of one request.
    /// If more than `history_window` records land between a request's append
    /// and its snapshot, that request's own record is outside its window; the
    /// reply's `data` and `position` still identify it.
    pub async fn history(&self) -> Vec<EvaluationRecord> {
        if self.history_window == 0 {
            self.ledger.snapshot().await
        } else {
            self.ledger.snapshot_tail(self.history_window).await
        }
    }

    /// Convenience wrapper for callers holding three present fields.
    pub async fn check(&self, x: &str, y: &str, r: &str) -> CheckReply {
        self.handle(RawInput::new(x, y, r)).await
    }

    /// Process one request. Never fails: every outcome is an envelope.
    pub async fn handle(&self, raw: RawInput) -> CheckReply {
        let span = obs::request_span(Uuid::new_v4());
        self.run(raw).instrument(span).await
    }

    async fn run(&self, raw: RawInput) -> CheckReply {
        let started = Instant::now();
        METRICS.inc_requests();
        obs::emit_stage(RequestStage::Received);
        obs::emit_check_received(raw.x.as_deref(), raw.y.as_deref(), raw.r.as_deref());

        let input = match self.validator.validate_input(&raw) {
            Ok(input) => input,
            Err(errors) => {
                METRICS.inc_rejected();
                obs::emit_check_rejected(errors.len());
                let messages = errors.iter().map(ToString::to_string).collect();
                return self.respond(Err(messages), Some(Rejection::Invalid), None).await;
            }
        };
        obs::emit_stage(RequestStage::Validated);

        let hit = self.area.evaluate(&input);
        let processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        METRICS.record_verdict(hit);
        obs::emit_check_evaluated(input.x, input.y, input.r, hit, processing_time_ms);
        obs::emit_stage(RequestStage::Evaluated);

        let record = EvaluationRecord::new(input.x, input.y, input.r, hit, processing_time_ms);
        match self.append_to_completion(record).await {
            Ok(position) => {
                obs::emit_check_recorded(position);
                obs::emit_stage(RequestStage::Recorded);
                self.respond(Ok(record), None, Some(position)).await
            }
            Err(e) => {
                METRICS.inc_ledger_failures();
                obs::emit_ledger_error(&e);
                self.respond(
                    Err(vec![e.to_string()]),
                    Some(Rejection::LedgerUnavailable),
                    None,
                )
                .await
            }
        }
    }

    /// Append on a detached task so that dropping the request future (a
    /// client disconnect) cannot stop an append that has already started.
    async fn append_to_completion(
        &self,
        record: EvaluationRecord,
    ) -> Result<LedgerPosition, LedgerError> {
        let ledger = Arc::clone(&self.ledger);
        tokio::spawn(async move { ledger.append(record).await }.in_current_span())
            .await
            .map_err(|e| LedgerError::Unavailable(format!("append task failed: {e}")))?
    }

    async fn respond(
        &self,
        outcome: Result<EvaluationRecord, Vec<String>>,
        rejection: Option<Rejection>,
        position: Option<LedgerPosition>,
    ) -> CheckReply {
        let envelope = build_response(outcome, self.history().await);
        obs::emit_stage(RequestStage::Responded);
        CheckReply {
            envelope,
            rejection,
            position,
        }
    }
}

impl std::fmt::Debug for CheckEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckEngine")
            .field("validator", &self.validator)
            .field("area", &self.area.name())
            .field("history_window", &self.history_window)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hit_ledger::MemoryHistoryLedger;

    fn engine() -> CheckEngine {
        CheckEngine::new(&EngineConfig::default(), Arc::new(MemoryHistoryLedger::new()))
    }

    #[tokio::test]
    async fn valid_request_is_recorded() {
        let engine = engine();
        let reply = engine.check("0", "0", "1").await;

        assert!(reply.envelope.is_ok());
        assert_eq!(reply.rejection, None);
        assert_eq!(reply.position, Some(LedgerPosition(0)));
        assert_eq!(engine.ledger().len().await, 1);
    }

    #[tokio::test]
    async fn invalid_request_is_not_recorded() {
        let engine = engine();
        let reply = engine.check("-3.1", "0", "1").await;

        assert_eq!(reply.rejection, Some(Rejection::Invalid));
        assert_eq!(reply.position, None);
        assert!(engine.ledger().is_empty().await);
    }

    #[tokio::test]
    async fn window_limits_history() {
        let config = EngineConfig {
            history_window: 2,
            ..EngineConfig::default()
        };
        let engine = CheckEngine::new(&config, Arc::new(MemoryHistoryLedger::new()));
        for x in ["1", "2", "3"] {
            engine.check(x, "0", "1").await;
        }
        let reply = engine.check("4", "0", "1").await;

        let xs: Vec<f64> = reply.envelope.history().iter().map(|r| r.x).collect();
        assert_eq!(xs, vec![3.0, 4.0]);
        assert_eq!(engine.ledger().len().await, 4, "ledger itself keeps everything");
    }

    /// Lets `burst` other records land right after each append.
    struct BusyLedger {
        inner: MemoryHistoryLedger,
        burst: usize,
    }

    #[async_trait::async_trait]
    impl HistoryLedger for BusyLedger {
        async fn append(&self, record: EvaluationRecord) -> hit_ledger::LedgerResult<LedgerPosition> {
            let position = self.inner.append(record).await?;
            for _ in 0..self.burst {
                self.inner
                    .append(EvaluationRecord::new(5.0, 5.0, 3.0, false, 0))
                    .await?;
            }
            Ok(position)
        }

        async fn snapshot(&self) -> Vec<EvaluationRecord> {
            self.inner.snapshot().await
        }

        async fn snapshot_tail(&self, limit: usize) -> Vec<EvaluationRecord> {
            self.inner.snapshot_tail(limit).await
        }

        async fn len(&self) -> usize {
            self.inner.len().await
        }
    }

    #[tokio::test]
    async fn crowded_out_record_is_still_identified() {
        let config = EngineConfig {
            history_window: 2,
            ..EngineConfig::default()
        };
        let ledger = Arc::new(BusyLedger {
            inner: MemoryHistoryLedger::new(),
            burst: 3,
        });
        let engine = CheckEngine::new(&config, ledger);

        let reply = engine.check("-1", "-1", "2").await;

        let data = reply.envelope.data().copied().unwrap();
        assert_eq!(reply.position, Some(LedgerPosition(0)));
        assert_eq!(reply.envelope.history().len(), 2);
        assert!(!reply.envelope.history().contains(&data));
        assert_eq!(engine.ledger().snapshot().await[0], data);
    }

    #[test]
    fn stage_names() {
        assert_eq!(RequestStage::Recorded.as_str(), "recorded");
    }
}
