//! HTTP ingress handlers.
//!
//! The send endpoint is a pure translator: it reads the raw request body,
//! wire-encodes it, and hands it to the queue endpoint. The status code
//! reflects enqueue success or failure only; processing happens later,
//! behind the queue. No retries happen here - a caller that retries a
//! failed request produces a duplicate message.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::QueueError;
use crate::queue::{QueueEndpoint, SendMessageRequest};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub queue: Arc<dyn QueueEndpoint>,
}

impl AppState {
    pub fn new(config: Config, queue: Arc<dyn QueueEndpoint>) -> Self {
        Self {
            config: Arc::new(config),
            queue,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Send Message
// =============================================================================

/// Send response body. Informational only; the status code is the contract.
#[derive(Serialize)]
pub struct SendResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// `POST /send_message` endpoint.
///
/// Status mapping, applied deterministically:
/// - `202 Accepted`: the queue took the write. Accepted for later
///   processing, not processed.
/// - `400 Bad Request`: the queue rejected the request for a
///   client-attributable reason.
/// - `500 Internal Server Error`: provider-side failure; the caller may
///   retry, at the cost of a possible duplicate message.
pub async fn send_message(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    info!(body_length = body.len(), "send_message_received");

    let request = SendMessageRequest::encode(&state.config.queue_path(), &body);

    match state.queue.handle_send(request).await {
        Ok(receipt) => {
            info!(
                message_id = %receipt.message_id,
                body_sha256 = %receipt.body_sha256,
                "send_message_enqueued"
            );
            (
                StatusCode::ACCEPTED,
                Json(SendResponse {
                    status: "accepted",
                    message_id: Some(receipt.message_id),
                }),
            )
        }
        Err(QueueError::Rejected(reason)) => {
            warn!(reason = %reason, "send_message_rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(SendResponse {
                    status: "rejected",
                    message_id: None,
                }),
            )
        }
        Err(e) => {
            error!(error = %e, "send_message_failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SendResponse {
                    status: "error",
                    message_id: None,
                }),
            )
        }
    }
}
