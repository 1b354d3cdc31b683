//! Processing handler contract and the default logging handler.
//!
//! Handlers are the pluggable business end of the pipeline. The consumer
//! binding invokes them once per delivery attempt; everything they report
//! handled gets deleted, everything else re-surfaces after the visibility
//! window. Because delivery is at-least-once, handlers must tolerate seeing
//! the same message twice.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::queue::QueueMessage;

/// Outcome the handler reports for a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Handled; the binding deletes the message.
    Ok,
    /// Not handled; the message re-surfaces after its visibility window.
    Failed,
}

/// Outcome the handler reports for a whole batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every message handled
    AllOk,
    /// Nothing handled
    AllFailed,
    /// One disposition per input message, in order
    PerMessage(Vec<MessageOutcome>),
}

/// Business logic invoked per batch of delivered messages.
///
/// Implementations must be idempotent under duplicate delivery and finish
/// well under the visibility timeout. Failure is a return value, not a
/// panic; panics and overruns are treated as batch-wide failures by the
/// consumer binding.
#[async_trait]
pub trait ProcessingHandler: Send + Sync {
    async fn process(&self, batch: &[QueueMessage]) -> BatchOutcome;
}

/// Default handler: logs each message's `Message` field.
///
/// Bodies are expected to be JSON objects like `{"Message": "..."}`; other
/// payloads are logged with a placeholder. Logging is the only side effect,
/// so duplicate deliveries are harmless.
pub struct MessageLogger;

#[async_trait]
impl ProcessingHandler for MessageLogger {
    async fn process(&self, batch: &[QueueMessage]) -> BatchOutcome {
        for message in batch {
            info!(
                message_id = %message.id,
                receive_count = message.receive_count,
                message = %message_field(&message.body),
                "message_consumed"
            );
        }

        BatchOutcome::AllOk
    }
}

/// Extract the `Message` field from a JSON body.
fn message_field(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return "No Message field in POST body".to_string();
    };

    match value.get("Message") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => "No Message field in POST body".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn message(id: &str, body: &[u8]) -> QueueMessage {
        QueueMessage {
            id: id.to_string(),
            body: body.to_vec(),
            enqueued_at_ms: 0,
            receive_count: 1,
        }
    }

    #[test]
    fn test_message_field_present() {
        assert_eq!(message_field(br#"{"Message": "hello"}"#), "hello");
    }

    #[test]
    fn test_message_field_non_string() {
        assert_eq!(message_field(br#"{"Message": 42}"#), "42");
    }

    #[test]
    fn test_message_field_missing() {
        assert_eq!(
            message_field(br#"{"other": "x"}"#),
            "No Message field in POST body"
        );
    }

    #[test]
    fn test_message_field_not_json() {
        assert_eq!(message_field(b"a&b=c"), "No Message field in POST body");
    }

    #[tokio::test]
    async fn test_message_logger_reports_all_ok() {
        let batch = vec![
            message("m1", br#"{"Message": "one"}"#),
            message("m2", b"not json"),
        ];

        assert_eq!(MessageLogger.process(&batch).await, BatchOutcome::AllOk);
    }

    /// Handler that performs one side effect per distinct message id.
    struct DedupingHandler {
        seen: Mutex<HashSet<String>>,
        side_effects: Mutex<u32>,
    }

    impl DedupingHandler {
        fn new() -> Self {
            Self {
                seen: Mutex::new(HashSet::new()),
                side_effects: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl ProcessingHandler for DedupingHandler {
        async fn process(&self, batch: &[QueueMessage]) -> BatchOutcome {
            for message in batch {
                if self.seen.lock().unwrap().insert(message.id.clone()) {
                    *self.side_effects.lock().unwrap() += 1;
                }
            }
            BatchOutcome::AllOk
        }
    }

    #[tokio::test]
    async fn test_duplicate_delivery_has_one_side_effect() {
        let handler = DedupingHandler::new();
        let batch = vec![message("m1", b"payload")];

        // The queue may deliver the same message more than once; an
        // idempotent handler absorbs the duplicate.
        handler.process(&batch).await;
        handler.process(&batch).await;

        assert_eq!(*handler.side_effects.lock().unwrap(), 1);
    }
}
