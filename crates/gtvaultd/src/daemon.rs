//! Daemon lifecycle: key resolution, metrics, systemd notify, API server

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use gtvault_core::config::GtvaultConfig;
use gtvault_crypto::{EnvelopeCodec, KeyProvider};
use gtvault_pipeline::{PipelineMetrics, PipelineState};
use prometheus_client::registry::Registry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::metrics::HealthState;

pub async fn run(config: GtvaultConfig, shutdown: CancellationToken) -> Result<()> {
    info!("daemon starting");

    config.validate().context("invalid configuration")?;

    // ── Envelope key ─────────────────────────────────────────────────────
    let provider = KeyProvider::from_config(&config.crypto);
    let key = provider
        .resolve()
        .with_context(|| format!("resolving envelope key from ${}", provider.env_var()))?;
    let codec = EnvelopeCodec::new(Arc::new(key), config.crypto.cipher);

    info!(
        cipher = %codec.suite(),
        key_fingerprint = %codec.key_fingerprint(),
        environment = ?config.server.environment,
        "envelope key loaded"
    );

    // ── Metrics ──────────────────────────────────────────────────────────
    let mut registry = Registry::default();
    let metrics = Arc::new(PipelineMetrics::register(&mut registry));
    let ready = Arc::new(AtomicBool::new(false));

    if let Some(addr) = config.server.metrics_addr.clone() {
        let health = HealthState {
            registry: Arc::new(registry),
            ready: ready.clone(),
        };
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = crate::metrics::serve(addr, health, token).await {
                error!("metrics server failed: {e}");
            }
        });
    }

    // ── API server ───────────────────────────────────────────────────────
    let state = PipelineState::new(codec, &config, metrics);
    let app = gtvault_pipeline::router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding API listener {}", config.server.listen))?;

    info!(
        addr = %config.server.listen,
        max_payload_bytes = config.limits.max_payload_bytes,
        request_budget_ms = config.limits.request_budget_ms,
        "API: listening"
    );

    ready.store(true, Ordering::Relaxed);
    notify_ready();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await
        .context("API server")?;

    ready.store(false, Ordering::Relaxed);
    info!("daemon stopped");
    Ok(())
}

#[cfg(not(unix))]
fn notify_ready() {}

#[cfg(unix)]
fn notify_ready() {
    // sd_notify(READY=1) via $NOTIFY_SOCKET; no-op when not under systemd
    if let Ok(socket) = std::env::var("NOTIFY_SOCKET") {
        use std::os::unix::net::UnixDatagram;
        if let Ok(sock) = UnixDatagram::unbound() {
            let _ = sock.send_to(b"READY=1\n", &socket);
            tracing::debug!(notify_socket = %socket, "sent systemd READY=1");
        }
    }
}
