//! Consumer binding - delivers queue batches to the processing handler.
//!
//! Each poller loops: lease a batch, invoke the handler once for this
//! delivery attempt, delete what the handler reports handled. Failures,
//! timeouts, and panics delete nothing; the untouched messages re-surface
//! when their visibility window lapses, and the queue dead-letters them
//! once the receive-count cap is hit. Processing outcomes are never
//! reported back to the original HTTP caller.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::process::{BatchOutcome, MessageOutcome, ProcessingHandler};
use crate::queue::{DurableQueue, QueueMessage};

/// Consumer binding between a durable queue and a processing handler.
pub struct Consumer {
    queue: Arc<dyn DurableQueue>,
    handler: Arc<dyn ProcessingHandler>,
    config: Config,
}

impl Consumer {
    pub fn new(
        queue: Arc<dyn DurableQueue>,
        handler: Arc<dyn ProcessingHandler>,
        config: Config,
    ) -> Self {
        Self {
            queue,
            handler,
            config,
        }
    }

    /// Run pollers until `shutdown` flips to true.
    pub async fn run(self: Arc<Self>, shutdown: watch::Receiver<bool>) {
        info!(
            concurrency = self.config.consumer_concurrency,
            batch_size = self.config.receive_batch_size,
            "consumer_starting"
        );

        let mut pollers = Vec::new();
        for poller_id in 0..self.config.consumer_concurrency {
            let consumer = Arc::clone(&self);
            let shutdown = shutdown.clone();
            pollers.push(tokio::spawn(async move {
                consumer.poll_loop(poller_id, shutdown).await;
            }));
        }

        let _ = join_all(pollers).await;
        info!("consumer_stopped");
    }

    async fn poll_loop(&self, poller_id: usize, mut shutdown: watch::Receiver<bool>) {
        info!(poller_id = poller_id, "poller_started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let idle = match self.poll_once().await {
                Ok(received) => received == 0,
                Err(e) => {
                    error!(poller_id = poller_id, error = %e, "poller_receive_failed");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = sleep(self.config.poll_interval) => {}
                    changed = shutdown.changed() => {
                        // A dropped sender also means shutdown
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }

        info!(poller_id = poller_id, "poller_stopped");
    }

    /// Lease one batch and dispatch it. Returns the batch size received.
    pub async fn poll_once(&self) -> Result<usize> {
        let batch = self
            .queue
            .receive(self.config.receive_batch_size, self.config.visibility_timeout)
            .await?;

        if batch.is_empty() {
            return Ok(0);
        }

        let received = batch.len();
        info!(batch_size = received, "consumer_batch_received");

        let outcome = self.invoke_handler(batch.clone()).await;
        self.settle(&batch, outcome).await;

        Ok(received)
    }

    /// Invoke the handler once, isolated from panics and bounded by the
    /// handler timeout.
    async fn invoke_handler(&self, batch: Vec<QueueMessage>) -> BatchOutcome {
        let handler = Arc::clone(&self.handler);
        let mut handle = tokio::spawn(async move { handler.process(&batch).await });

        match timeout(self.config.handler_timeout, &mut handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => {
                error!(error = %join_err, "handler_panicked");
                BatchOutcome::AllFailed
            }
            Err(_) => {
                handle.abort();
                warn!(
                    timeout_secs = self.config.handler_timeout.as_secs(),
                    "handler_timed_out"
                );
                BatchOutcome::AllFailed
            }
        }
    }

    /// Delete what the handler handled; leave the rest to lapse back into
    /// visibility.
    async fn settle(&self, batch: &[QueueMessage], outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::AllOk => {
                for message in batch {
                    self.delete_message(message).await;
                }
            }
            BatchOutcome::AllFailed => {
                // The absence of delete is the recovery signal
                warn!(batch_size = batch.len(), "consumer_batch_failed");
            }
            BatchOutcome::PerMessage(outcomes) => {
                if outcomes.len() != batch.len() {
                    error!(
                        batch_size = batch.len(),
                        outcomes = outcomes.len(),
                        "handler_outcome_count_mismatch"
                    );
                    return;
                }

                let mut failed = 0usize;
                for (message, outcome) in batch.iter().zip(outcomes) {
                    match outcome {
                        MessageOutcome::Ok => self.delete_message(message).await,
                        MessageOutcome::Failed => failed += 1,
                    }
                }

                if failed > 0 {
                    warn!(failed = failed, "consumer_messages_failed");
                }
            }
        }
    }

    async fn delete_message(&self, message: &QueueMessage) {
        match self.queue.delete(&message.id).await {
            Ok(()) => {}
            Err(e) => {
                // Lease already lapsed: the message will be redelivered and
                // the handler's idempotence absorbs the duplicate
                warn!(message_id = %message.id, error = %e, "consumer_delete_failed");
            }
        }
    }
}
