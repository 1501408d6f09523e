//! HTTP surface for browser-side age checks.
//!
//! `POST /verify-age` takes `{"min_age": <int>, "pin": "<digits>"}` and
//! answers `{"status": "VERIFIED" | "DENIED"}` or `{"error": ...}` with a
//! status code per failure kind. Input is validated before the device is
//! touched. Only origins starting with the configured prefix pass CORS.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, request::Parts, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::error;

use crate::error::ApiError;
use crate::service::{DeviceService, LinkStatus, VerificationOutcome};
use crate::validation::{MinimumAge, Pin, ValidationError};

#[derive(Debug, Clone)]
pub struct RestContext {
    pub service: DeviceService,
    /// CORS admits origins starting with this, e.g. `chrome-extension://`.
    pub allowed_origin_prefix: String,
}

pub fn build_router(ctx: RestContext) -> Router {
    let cors = cors_layer(&ctx.allowed_origin_prefix);

    Router::new()
        .route("/health", get(health))
        .route("/device/status", get(device_status))
        .route("/verify-age", post(verify_age))
        .layer(cors)
        .with_state(ctx)
}

fn cors_layer(prefix: &str) -> CorsLayer {
    let prefix = prefix.as_bytes().to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| origin.as_bytes().starts_with(&prefix),
        ))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

async fn health() -> &'static str {
    "ok"
}

async fn device_status(State(ctx): State<RestContext>) -> Json<LinkStatus> {
    Json(ctx.service.status().await)
}

async fn verify_age(
    State(ctx): State<RestContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) =
        body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let (min_age, pin) = parse_request(&payload)?;

    // Once CHK_AGE is on the wire the exchange runs to completion, even if
    // the client goes away.
    let handler = ctx.service.verification();
    let outcome = tokio::spawn(async move { handler.verify(min_age, &pin).await })
        .await
        .map_err(|e| {
            error!(error = %e, "verification task failed");
            ApiError::Internal
        })?;

    into_response(outcome)
}

/// Pull and validate `min_age` and `pin` from a request body.
///
/// `min_age` must be a JSON integer and `pin` a JSON string; numbers in
/// strings and vice versa are rejected.
pub fn parse_request(payload: &Value) -> Result<(MinimumAge, Pin), ApiError> {
    let (Some(min_age), Some(pin)) = (payload.get("min_age"), payload.get("pin")) else {
        return Err(ApiError::BadRequest("Missing min_age or pin".to_string()));
    };

    let min_age = min_age
        .as_i64()
        .ok_or(ValidationError::MinimumAge)
        .and_then(MinimumAge::new)?;
    let pin = pin
        .as_str()
        .ok_or(ValidationError::Pin)
        .and_then(Pin::parse)?;
    Ok((min_age, pin))
}

fn into_response(outcome: VerificationOutcome) -> Result<Json<Value>, ApiError> {
    match outcome {
        VerificationOutcome::Verified | VerificationOutcome::Denied => {
            Ok(Json(json!({ "status": outcome.status() })))
        }
        VerificationOutcome::Unreachable(_) => Err(ApiError::DeviceUnreachable),
        VerificationOutcome::Timeout => Err(ApiError::Timeout),
        VerificationOutcome::Anomaly(details) => Err(ApiError::Anomaly(details)),
        VerificationOutcome::LinkLost(_) => Err(ApiError::LinkLost),
    }
}
