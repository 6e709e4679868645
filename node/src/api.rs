//! # Rosetta HTTP API
//!
//! Builds the axum router in front of [`RosettaService`]. Every Rosetta
//! endpoint is a `POST` with a JSON body and answers either the typed
//! response or a Rosetta error body.
//!
//! ## Endpoints
//!
//! | Method | Path                      | Description                           |
//! |--------|---------------------------|---------------------------------------|
//! | GET    | `/health`                 | Liveness probe                        |
//! | POST   | `/network/list`           | Networks served                       |
//! | POST   | `/network/options`        | Versions, operation types, errors     |
//! | POST   | `/network/status`         | Chain tip from the node               |
//! | POST   | `/construction/derive`    | Address of a public key               |
//! | POST   | `/construction/preprocess`| Operations to metadata options        |
//! | POST   | `/construction/metadata`  | Nonce, fee and PoX state              |
//! | POST   | `/construction/payloads`  | Unsigned tx and signing payload       |
//! | POST   | `/construction/combine`   | Unsigned tx plus signature            |
//! | POST   | `/construction/parse`     | Tx back to operations                 |
//! | POST   | `/construction/hash`      | Txid of a signed tx                   |
//! | POST   | `/construction/submit`    | Broadcast a signed tx                 |
//!
//! ## Request handling
//!
//! ```text
//!   body ─► JSON ─► validate_request ─► typed request ─► service step
//!            │            │                   │               │
//!       InvalidParams  schema/network    InvalidParams   RosettaError
//! ```

use std::future::Future;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use stacks_rosetta::rosetta::validate_request;
use stacks_rosetta::{RosettaError, RosettaErrorKind, RosettaService};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: RosettaService,
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/network/list", post(network_list))
        .route("/network/options", post(network_options))
        .route("/network/status", post(network_status))
        .route("/construction/derive", post(construction_derive))
        .route("/construction/preprocess", post(construction_preprocess))
        .route("/construction/metadata", post(construction_metadata))
        .route("/construction/payloads", post(construction_payloads))
        .route("/construction/combine", post(construction_combine))
        .route("/construction/parse", post(construction_parse))
        .route("/construction/hash", post(construction_hash))
        .route("/construction/submit", post(construction_submit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request plumbing
// ---------------------------------------------------------------------------

fn error_response(err: &RosettaError) -> Response {
    let status = StatusCode::from_u16(err.kind.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(err.body())).into_response()
}

/// Parses, validates and types a request body for `endpoint`.
fn decode<T: DeserializeOwned>(
    state: &AppState,
    endpoint: &str,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, RosettaError> {
    let Json(mut value) = body.map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidParams, e.body_text()))?;
    validate_request(endpoint, &mut value, state.service.config())?;
    serde_json::from_value(value).map_err(|e| RosettaError::with_message(RosettaErrorKind::InvalidParams, e))
}

/// Runs one Rosetta step and records its outcome.
async fn handle<Req, Resp, F, Fut>(
    state: &AppState,
    endpoint: &'static str,
    body: Result<Json<Value>, JsonRejection>,
    step: F,
) -> Response
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: FnOnce(RosettaService, Req) -> Fut,
    Fut: Future<Output = Result<Resp, RosettaError>>,
{
    let started = Instant::now();
    let result = match decode::<Req>(state, endpoint, body) {
        Ok(req) => step(state.service.clone(), req).await,
        Err(err) => Err(err),
    };

    let (response, error_code) = match result {
        Ok(resp) => ((StatusCode::OK, Json(resp)).into_response(), None),
        Err(err) => {
            tracing::debug!(endpoint, code = err.kind.code(), details = ?err.details, "request failed");
            (error_response(&err), Some(err.kind.code()))
        }
    };
    state
        .metrics
        .observe(endpoint, response.status(), started.elapsed(), error_code);
    response
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is up. Does not reach the node.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn network_list(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/network/list", body, |svc, _: stacks_rosetta::rosetta::MetadataRequest| async move {
        Ok::<_, RosettaError>(svc.network_list())
    })
    .await
}

async fn network_options(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/network/options", body, |svc, req| async move { svc.network_options(req).await }).await
}

async fn network_status(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/network/status", body, |svc, req| async move { svc.network_status(req).await }).await
}

async fn construction_derive(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/construction/derive", body, |svc, req| async move { svc.derive(req) }).await
}

async fn construction_preprocess(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    handle(&state, "/construction/preprocess", body, |svc, req| async move { svc.preprocess(req) }).await
}

async fn construction_metadata(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    handle(&state, "/construction/metadata", body, |svc, req| async move { svc.metadata(req).await }).await
}

async fn construction_payloads(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    handle(&state, "/construction/payloads", body, |svc, req| async move { svc.payloads(req) }).await
}

async fn construction_combine(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/construction/combine", body, |svc, req| async move { svc.combine(req) }).await
}

async fn construction_parse(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/construction/parse", body, |svc, req| async move { svc.parse(req).await }).await
}

async fn construction_hash(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/construction/hash", body, |svc, req| async move { svc.hash(req) }).await
}

async fn construction_submit(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(&state, "/construction/submit", body, |svc, req| async move { svc.submit(req).await }).await
}
