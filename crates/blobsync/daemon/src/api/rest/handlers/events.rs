//! Event entry point
//!
//! Any notification delivered here triggers one full sync. The payload is
//! ignored, apart from the Event Grid subscription-validation handshake that
//! has to be answered before deliveries start.

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use blobsync_core::Trigger;
use serde::{Deserialize, Serialize};

/// Header Event Grid uses to tag the delivery type.
pub const EVENT_TYPE_HEADER: &str = "aeg-event-type";

/// Header carrying the event key, as an alternative to `?code=`.
pub const EVENT_KEY_HEADER: &str = "x-functions-key";

const SUBSCRIPTION_VALIDATION: &str = "SubscriptionValidation";

/// Query parameters on event deliveries
#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GridEvent {
    #[serde(default)]
    data: Option<ValidationData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationData {
    validation_code: Option<String>,
}

/// Handshake reply
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub validation_response: String,
}

/// Receive an event notification
pub async fn receive_event(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    authorize(state.event_key.as_deref(), &query, &headers)?;

    let is_validation = headers
        .get(EVENT_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case(SUBSCRIPTION_VALIDATION));

    if is_validation {
        let validation_response = validation_code(&body)?;
        tracing::info!("Answered event subscription validation");
        return Ok(Json(ValidationResponse {
            validation_response,
        })
        .into_response());
    }

    tracing::info!(payload_bytes = body.len(), "Event notification received");
    state.pipeline.run(Trigger::Event).await;

    Ok(StatusCode::OK.into_response())
}

/// CloudEvents webhook abuse-protection preflight
pub async fn event_preflight(headers: HeaderMap) -> Response {
    let origin = headers
        .get("webhook-request-origin")
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("*"));

    let mut response = StatusCode::OK.into_response();
    response
        .headers_mut()
        .insert("webhook-allowed-origin", origin);
    response
}

fn authorize(expected: Option<&str>, query: &EventQuery, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let presented = query.code.as_deref().or_else(|| {
        headers
            .get(EVENT_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
    });
    match presented {
        Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => Ok(()),
        _ => {
            tracing::warn!("Rejected event delivery with a missing or wrong key");
            Err(ApiError::Unauthorized)
        }
    }
}

/// Comparison whose running time does not depend on where the keys differ.
fn keys_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn validation_code(body: &[u8]) -> ApiResult<String> {
    let events: Vec<GridEvent> = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid validation payload: {}", e)))?;

    events
        .into_iter()
        .find_map(|event| event.data.and_then(|data| data.validation_code))
        .ok_or_else(|| ApiError::BadRequest("validation payload has no validationCode".to_string()))
}
