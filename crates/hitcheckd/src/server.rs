//! Axum routes for hitcheckd.
//!
//! - `POST /api/check`: form-encoded `x`, `y`, `r`; fields missing from the
//!   body are taken from the query string
//! - `GET /api/check`: the same fields in the query string
//! - `GET /api/history`: the response history window
//! - `GET /health`: liveness plus counters

use std::time::Instant;

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use hit_core::{
    CheckEngine, CheckReply, EvaluationRecord, HistoryLedger, RawInput, Rejection, METRICS,
};
use serde_json::json;

#[derive(Clone)]
pub struct AppState {
    engine: CheckEngine,
    started: Instant,
}

pub fn router(engine: CheckEngine) -> Router {
    let state = AppState {
        engine,
        started: Instant::now(),
    };
    Router::new()
        .route("/api/check", get(check_query).post(check_form))
        .route("/api/history", get(history))
        .route("/health", get(health))
        .with_state(state)
}

/// Undecodable bodies still get an envelope: the engine reports every field
/// as missing.
async fn check_form(
    State(state): State<AppState>,
    query: Result<Query<RawInput>, QueryRejection>,
    form: Result<Form<RawInput>, FormRejection>,
) -> Response {
    let body = match form {
        Ok(Form(raw)) => raw,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "undecodable check form");
            RawInput::default()
        }
    };
    let raw = body.or(query_input(query));
    reply_response(state.engine.handle(raw).await)
}

async fn check_query(
    State(state): State<AppState>,
    query: Result<Query<RawInput>, QueryRejection>,
) -> Response {
    reply_response(state.engine.handle(query_input(query)).await)
}

fn query_input(query: Result<Query<RawInput>, QueryRejection>) -> RawInput {
    match query {
        Ok(Query(raw)) => raw,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "undecodable check query");
            RawInput::default()
        }
    }
}

async fn history(State(state): State<AppState>) -> Json<Vec<EvaluationRecord>> {
    Json(state.engine.history().await)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": hit_core::VERSION,
        "area": state.engine.area().name(),
        "uptime_secs": state.started.elapsed().as_secs(),
        "records": state.engine.ledger().len().await,
        "metrics": METRICS.snapshot(),
    }))
}

fn status_for(rejection: Option<Rejection>) -> StatusCode {
    match rejection {
        None => StatusCode::OK,
        Some(Rejection::Invalid) => StatusCode::BAD_REQUEST,
        Some(Rejection::LedgerUnavailable) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply_response(reply: CheckReply) -> Response {
    (status_for(reply.rejection), Json(reply.envelope)).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use hit_core::{EngineConfig, FileHistoryLedger, MemoryHistoryLedger};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        router(CheckEngine::new(
            &EngineConfig::default(),
            Arc::new(MemoryHistoryLedger::new()),
        ))
    }

    fn form_request(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/api/check")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn post_form_records_point() {
        let app = app();
        let (status, body) = send(&app, form_request("x=2&y=1&r=2")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["data"]["x"], 2.0);
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
        assert_eq!(body["history"][0], body["data"]);
    }

    #[tokio::test]
    async fn comma_decimal_in_form_body() {
        let app = app();
        let (status, body) = send(&app, form_request("x=-1%2C5&y=-1&r=2%2C5")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["x"], -1.5);
        assert_eq!(body["data"]["r"], 2.5);
    }

    #[tokio::test]
    async fn get_query_reaches_engine() {
        let app = app();
        let (status, body) = send(&app, get_request("/api/check?x=0&y=0&r=1")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["hit"], true);
    }

    #[tokio::test]
    async fn post_combines_query_and_body_fields() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/check?x=4&y=0&r=2")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("x=0"))
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["x"], 0.0, "body value wins");
        assert_eq!(body["data"]["r"], 2.0);
    }

    #[tokio::test]
    async fn post_with_query_only_is_accepted() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/check?x=1&y=1&r=3")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["y"], 1.0);
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request_with_history() {
        let app = app();
        send(&app, form_request("x=1&y=1&r=1")).await;

        let (status, body) = send(&app, form_request("x=abc&y=1&r=2")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(!body["errors"].as_array().unwrap().is_empty());
        assert_eq!(body["history"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_fields_are_reported() {
        let app = app();
        let (status, body) = send(&app, form_request("x=1")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"][0], "missing parameter: y");
        assert_eq!(body["errors"][1], "missing parameter: r");
    }

    #[tokio::test]
    async fn wrong_content_type_becomes_validation_error() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/check")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("x=1&y=1&r=1"))
            .unwrap();

        let (status, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn history_endpoint_lists_records() {
        let app = app();
        send(&app, form_request("x=1&y=1&r=1")).await;
        send(&app, get_request("/api/check?x=-1&y=-1&r=3")).await;

        let (status, body) = send(&app, get_request("/api/history")).await;

        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["x"], -1.0);
    }

    #[tokio::test]
    async fn health_reports_records() {
        let app = app();
        send(&app, form_request("x=1&y=1&r=1")).await;

        let (status, body) = send(&app, get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["records"], 1);
        assert_eq!(body["area"], "quadrant");
        assert!(body["metrics"]["requests"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn file_backed_daemon_reloads_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        {
            let ledger = Arc::new(FileHistoryLedger::open(&path).await.unwrap());
            let app = router(CheckEngine::new(&EngineConfig::default(), ledger));
            send(&app, form_request("x=0&y=0&r=1")).await;
        }

        let ledger = Arc::new(FileHistoryLedger::open(&path).await.unwrap());
        let app = router(CheckEngine::new(&EngineConfig::default(), ledger));
        let (_, body) = send(&app, get_request("/api/history")).await;

        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(status_for(Some(Rejection::Invalid)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(Some(Rejection::LedgerUnavailable)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
