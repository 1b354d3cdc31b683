//! Web server module - the HTTP ingress surface.
//!
//! One route/method pair does real work: `POST /send_message` translates
//! the request body into a queue write and answers with the enqueue result.
//! Everything else is answered by the router itself (404 unknown route,
//! 405 wrong method) before any queue interaction.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{health, send_message, AppState, HealthResponse, SendResponse};

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/send_message", post(send_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
