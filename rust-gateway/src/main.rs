//! Postbox gateway - asynchronous HTTP-to-queue ingestion.
//!
//! Bootstrap order is explicit: load configuration, build the queue, start
//! the consumer pollers, then serve HTTP. Shutdown runs in reverse - the
//! server drains first, then the pollers are signalled and awaited.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use postbox::consumer::Consumer;
use postbox::process::MessageLogger;
use postbox::queue::{BodyCipher, MemoryQueue};
use postbox::web::{router, AppState};
use postbox::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("gateway_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        queue_path = %config.queue_path(),
        visibility_timeout_secs = config.visibility_timeout.as_secs(),
        max_receive_count = config.max_receive_count,
        consumer_concurrency = config.consumer_concurrency,
        encryption_key_configured = config.encryption_key.is_some(),
        "config_loaded"
    );

    // Create the durable queue; bodies are encrypted at rest either with
    // the configured key or a per-process managed key
    let cipher = match &config.encryption_key {
        Some(key) => BodyCipher::new(key),
        None => BodyCipher::managed(),
    };
    let queue = Arc::new(MemoryQueue::new(
        config.queue_path(),
        config.max_receive_count,
        cipher,
    ));
    info!(queue_path = %config.queue_path(), "queue_created");

    // Start the consumer pollers
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = Arc::new(Consumer::new(
        queue.clone(),
        Arc::new(MessageLogger),
        config.clone(),
    ));
    let consumer_task = tokio::spawn(Arc::clone(&consumer).run(shutdown_rx));
    info!("consumer_started");

    // Build the router
    let state = AppState::new(config.clone(), queue.clone());
    let app = router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "gateway_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop pollers and wait for in-flight batches
    shutdown_tx.send(true).ok();
    consumer_task.await.context("Consumer task failed")?;

    info!("gateway_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("gateway_shutting_down");
}
