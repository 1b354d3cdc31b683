//! Queue error taxonomy.
//!
//! The HTTP mapping is deterministic: `Rejected` is client-attributable and
//! becomes 400; `Unavailable` and `Internal` are provider-attributable and
//! become 500. `NotFound` and `Expired` are consumer-side signals from
//! `delete` and `extend_visibility` and never reach the HTTP caller.

use thiserror::Error;

/// Errors surfaced by the durable queue and its wire endpoint.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The request itself is at fault: unsupported action, unknown queue
    /// path, malformed form, empty or oversized body.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The queue cannot take the write right now (throttled, unreachable).
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The queue failed internally.
    #[error("internal queue error: {0}")]
    Internal(String),

    /// Delete target is not currently leased.
    #[error("message not found: {0}")]
    NotFound(String),

    /// Visibility extension arrived after the lease lapsed.
    #[error("visibility lease expired: {0}")]
    Expired(String),
}

/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
