//! Queue message types.

use serde::Serialize;

/// Hard cap on message body size, matching the queue service limit.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// A message owned by the durable queue from enqueue until it is deleted,
/// re-surfaces, or is dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Queue-assigned opaque identifier
    pub id: String,
    /// Opaque payload, exactly the bytes the producer sent
    pub body: Vec<u8>,
    /// Enqueue time, epoch milliseconds
    pub enqueued_at_ms: u64,
    /// Delivery attempts so far, including this one
    pub receive_count: u32,
}

/// Acknowledgment returned by the queue for an accepted send.
///
/// The digest lets producers verify the queue stored what they sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    /// Queue-assigned message identifier
    pub message_id: String,
    /// Hex SHA-256 of the message body
    pub body_sha256: String,
}
