//! SendMessage wire codec.
//!
//! An enqueue request is addressed to `{account_id}/{queue_name}` and
//! carries a form-encoded payload:
//!
//! ```text
//! Action=SendMessage&MessageBody=<percent-encoded bytes>
//! ```
//!
//! The body field is percent-encoded so bytes that are syntactically
//! significant in the form itself (`&`, `=`, `%`) survive intact. The
//! encoder is total over arbitrary byte sequences and the decoder restores
//! them byte for byte; a raw-interpolated body would instead be cut off at
//! the first separator.

use percent_encoding::{percent_decode, percent_encode, NON_ALPHANUMERIC};

use crate::error::QueueError;

/// Action identifier for an enqueue operation.
pub const ACTION_SEND_MESSAGE: &str = "SendMessage";

/// A wire-encoded request addressed to a queue endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    /// Target queue path, `{account_id}/{queue_name}`
    pub queue_path: String,
    /// Form-encoded request payload
    pub form: Vec<u8>,
}

impl SendMessageRequest {
    /// Encode a raw body into a SendMessage request for `queue_path`.
    pub fn encode(queue_path: &str, body: &[u8]) -> Self {
        let encoded: String = percent_encode(body, NON_ALPHANUMERIC).collect();
        let form = format!("Action={}&MessageBody={}", ACTION_SEND_MESSAGE, encoded).into_bytes();

        Self {
            queue_path: queue_path.to_string(),
            form,
        }
    }
}

/// A decoded SendMessage form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageForm {
    /// Requested action
    pub action: String,
    /// Message body, restored to the producer's original bytes
    pub message_body: Vec<u8>,
}

/// Decode a form payload.
///
/// Fields without a `=`, unknown fields, and duplicate or missing required
/// fields are rejected rather than guessed at.
pub fn decode_form(form: &[u8]) -> Result<SendMessageForm, QueueError> {
    let mut action: Option<String> = None;
    let mut message_body: Option<Vec<u8>> = None;

    for field in form.split(|&b| b == b'&') {
        if field.is_empty() {
            continue;
        }

        let separator = field.iter().position(|&b| b == b'=').ok_or_else(|| {
            QueueError::Rejected(format!(
                "malformed form field: {}",
                String::from_utf8_lossy(field)
            ))
        })?;

        let key = &field[..separator];
        let value: Vec<u8> = percent_decode(&field[separator + 1..]).collect();

        match key {
            b"Action" => {
                if action.is_some() {
                    return Err(QueueError::Rejected("duplicate Action field".to_string()));
                }
                action = Some(String::from_utf8_lossy(&value).into_owned());
            }
            b"MessageBody" => {
                if message_body.is_some() {
                    return Err(QueueError::Rejected(
                        "duplicate MessageBody field".to_string(),
                    ));
                }
                message_body = Some(value);
            }
            other => {
                return Err(QueueError::Rejected(format!(
                    "unexpected form field: {}",
                    String::from_utf8_lossy(other)
                )));
            }
        }
    }

    let action = action.ok_or_else(|| QueueError::Rejected("missing Action field".to_string()))?;
    let message_body =
        message_body.ok_or_else(|| QueueError::Rejected("missing MessageBody field".to_string()))?;

    Ok(SendMessageForm {
        action,
        message_body,
    })
}
