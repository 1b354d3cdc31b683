//! Durable queue module.
//!
//! This module provides:
//! - The queue contracts: [`QueueEndpoint`] for producers speaking the wire
//!   protocol and [`DurableQueue`] for consumers
//! - The wire codec for SendMessage requests
//! - An in-process queue implementation with visibility leases, receive
//!   counts, dead-lettering, and encryption at rest
//!
//! ## Delivery contract
//!
//! At-least-once, unordered. A received message is invisible for the
//! visibility timeout; deleting it inside the window acknowledges it,
//! otherwise it re-surfaces for redelivery. A finite receive-count cap
//! routes poison messages to the dead-letter store.

pub mod crypto;
pub mod memory;
pub mod types;
pub mod wire;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use crypto::BodyCipher;
pub use memory::MemoryQueue;
pub use types::{QueueMessage, SendReceipt, MAX_BODY_BYTES};
pub use wire::{decode_form, SendMessageForm, SendMessageRequest, ACTION_SEND_MESSAGE};

/// The queue service's public wire endpoint, as producers see it.
#[async_trait]
pub trait QueueEndpoint: Send + Sync {
    /// Handle a wire-encoded SendMessage request.
    async fn handle_send(&self, request: SendMessageRequest) -> Result<SendReceipt>;
}

/// The queue contract consumers operate against.
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Enqueue a message body. Every accepted call creates one message;
    /// a caller retry after an error produces a duplicate.
    async fn send(&self, body: Vec<u8>) -> Result<SendReceipt>;

    /// Lease up to `max_messages` messages for `visibility_timeout`.
    /// Leased messages are invisible to other receivers until the window
    /// lapses or they are deleted.
    async fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>>;

    /// Acknowledge a leased message, removing it permanently.
    async fn delete(&self, message_id: &str) -> Result<()>;

    /// Push a leased message's deadline out to `new_timeout` from now.
    async fn extend_visibility(&self, message_id: &str, new_timeout: Duration) -> Result<()>;
}
