//! Postbox - asynchronous HTTP-to-queue ingestion gateway.
//!
//! A public HTTP endpoint accepts a request body and durably enqueues it for
//! later, decoupled processing. No business logic runs in the request path;
//! the HTTP response reflects enqueue success only, never processing outcome.
//!
//! ## Architecture
//!
//! ```text
//! POST /send_message → Web Server → inbound-messages queue → Consumer → Handler
//! ```
//!
//! The queue is at-least-once: a received message stays invisible for the
//! visibility timeout and re-surfaces unless deleted, so handlers must be
//! idempotent. Messages that keep failing are dead-lettered after a finite
//! number of delivery attempts.

pub mod config;
pub mod consumer;
pub mod error;
pub mod process;
pub mod queue;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use consumer::Consumer;
pub use error::QueueError;
pub use process::{BatchOutcome, MessageLogger, MessageOutcome, ProcessingHandler};
pub use queue::{
    BodyCipher, DurableQueue, MemoryQueue, QueueEndpoint, QueueMessage, SendMessageRequest,
    SendReceipt,
};
pub use web::AppState;
