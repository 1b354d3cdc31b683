//! In-process durable queue with visibility leases.
//!
//! Messages live in one of three places: the ready deque (visible), the
//! leased map (invisible until a deadline), or the dead-letter store.
//! Bodies are sealed at rest and unsealed on delivery. Lease deadlines use
//! `tokio::time::Instant`, so tests drive expiry with a paused clock.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::{QueueError, Result};

use super::crypto::BodyCipher;
use super::types::{QueueMessage, SendReceipt, MAX_BODY_BYTES};
use super::wire::{self, SendMessageRequest};
use super::{DurableQueue, QueueEndpoint};

/// A stored message. The body stays sealed while the queue owns it.
struct Stored {
    id: String,
    sealed_body: Vec<u8>,
    enqueued_at_ms: u64,
    receive_count: u32,
}

struct Leased {
    stored: Stored,
    deadline: Instant,
}

#[derive(Default)]
struct State {
    ready: VecDeque<Stored>,
    leased: HashMap<String, Leased>,
    dead: Vec<Stored>,
}

/// In-process durable queue.
pub struct MemoryQueue {
    queue_path: String,
    max_receive_count: u32,
    cipher: BodyCipher,
    state: Mutex<State>,
}

impl MemoryQueue {
    /// Create a queue addressed by `queue_path`, dead-lettering messages
    /// after `max_receive_count` delivery attempts.
    pub fn new(queue_path: impl Into<String>, max_receive_count: u32, cipher: BodyCipher) -> Self {
        Self {
            queue_path: queue_path.into(),
            max_receive_count,
            cipher,
            state: Mutex::new(State::default()),
        }
    }

    /// Number of messages currently awaiting delivery.
    pub async fn depth(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    /// Dead-lettered messages, unsealed for out-of-band inspection.
    pub async fn dead_letters(&self) -> Result<Vec<QueueMessage>> {
        let state = self.state.lock().await;
        state
            .dead
            .iter()
            .map(|stored| {
                let body = self
                    .cipher
                    .unseal(&stored.sealed_body)
                    .ok_or_else(|| QueueError::Internal("sealed body corrupted".to_string()))?;
                Ok(QueueMessage {
                    id: stored.id.clone(),
                    body,
                    enqueued_at_ms: stored.enqueued_at_ms,
                    receive_count: stored.receive_count,
                })
            })
            .collect()
    }

    fn new_message_id() -> String {
        let mut raw = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut raw);
        hex::encode(raw)
    }

    fn now_epoch_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Return lapsed leases to the ready deque.
    fn reap_expired(state: &mut State, now: Instant) {
        let expired: Vec<String> = state
            .leased
            .iter()
            .filter(|(_, leased)| leased.deadline <= now)
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(leased) = state.leased.remove(&id) {
                info!(
                    message_id = %id,
                    receive_count = leased.stored.receive_count,
                    "queue_visibility_expired"
                );
                state.ready.push_back(leased.stored);
            }
        }
    }
}

#[async_trait]
impl QueueEndpoint for MemoryQueue {
    async fn handle_send(&self, request: SendMessageRequest) -> Result<SendReceipt> {
        if request.queue_path != self.queue_path {
            return Err(QueueError::Rejected(format!(
                "unknown queue path: {}",
                request.queue_path
            )));
        }

        let form = wire::decode_form(&request.form)?;

        if form.action != wire::ACTION_SEND_MESSAGE {
            return Err(QueueError::Rejected(format!(
                "unsupported action: {}",
                form.action
            )));
        }

        self.send(form.message_body).await
    }
}

#[async_trait]
impl DurableQueue for MemoryQueue {
    async fn send(&self, body: Vec<u8>) -> Result<SendReceipt> {
        if body.is_empty() {
            return Err(QueueError::Rejected("empty message body".to_string()));
        }

        if body.len() > MAX_BODY_BYTES {
            return Err(QueueError::Rejected(format!(
                "message body exceeds {} bytes",
                MAX_BODY_BYTES
            )));
        }

        let message_id = Self::new_message_id();
        let body_sha256 = hex::encode(Sha256::digest(&body));
        let body_length = body.len();

        let stored = Stored {
            id: message_id.clone(),
            sealed_body: self.cipher.seal(&body),
            enqueued_at_ms: Self::now_epoch_ms(),
            receive_count: 0,
        };

        self.state.lock().await.ready.push_back(stored);

        info!(
            message_id = %message_id,
            body_length = body_length,
            "queue_message_enqueued"
        );

        Ok(SendReceipt {
            message_id,
            body_sha256,
        })
    }

    async fn receive(
        &self,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueueMessage>> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        Self::reap_expired(&mut state, now);

        let mut batch = Vec::new();

        while batch.len() < max_messages {
            let Some(mut stored) = state.ready.pop_front() else {
                break;
            };

            // Another delivery would exceed the cap: dead-letter instead
            if stored.receive_count >= self.max_receive_count {
                warn!(
                    message_id = %stored.id,
                    receive_count = stored.receive_count,
                    "queue_message_dead_lettered"
                );
                state.dead.push(stored);
                continue;
            }

            let body = self
                .cipher
                .unseal(&stored.sealed_body)
                .ok_or_else(|| QueueError::Internal("sealed body corrupted".to_string()))?;

            stored.receive_count += 1;

            batch.push(QueueMessage {
                id: stored.id.clone(),
                body,
                enqueued_at_ms: stored.enqueued_at_ms,
                receive_count: stored.receive_count,
            });

            state.leased.insert(
                stored.id.clone(),
                Leased {
                    stored,
                    deadline: now + visibility_timeout,
                },
            );
        }

        Ok(batch)
    }

    async fn delete(&self, message_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        match state.leased.remove(message_id) {
            Some(_) => {
                info!(message_id = %message_id, "queue_message_deleted");
                Ok(())
            }
            None => Err(QueueError::NotFound(message_id.to_string())),
        }
    }

    async fn extend_visibility(&self, message_id: &str, new_timeout: Duration) -> Result<()> {
        let now = Instant::now();
        let mut state = self.state.lock().await;

        Self::reap_expired(&mut state, now);

        match state.leased.get_mut(message_id) {
            Some(leased) => {
                leased.deadline = now + new_timeout;
                info!(
                    message_id = %message_id,
                    extension_secs = new_timeout.as_secs(),
                    "queue_visibility_extended"
                );
                Ok(())
            }
            None => Err(QueueError::Expired(message_id.to_string())),
        }
    }
}
