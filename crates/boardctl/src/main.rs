//! Process entry point: loads config, wires the shared store and webhook
//! pipeline, and serves the control-plane API (spec.md §5, §4.7).

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use boardctl_api::{build_router, AppState};
use boardctl_core::{ControlPlaneConfig, Store};
use boardctl_webhooks::{channel, reconcile_undelivered, run_dispatcher, DEFAULT_QUEUE_CAPACITY};
use tokio::net::TcpListener;

/// How often the reconciliation sweep re-enqueues stale undelivered
/// payloads (spec.md §4.7 reconciliation paragraph).
const RECONCILE_SWEEP_INTERVAL_SECS: u64 = 60;
const RECONCILE_STALE_AFTER_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ControlPlaneConfig::from_env();
    boardctl_core::logging::init_tracing(&config);

    let store = Arc::new(Store::new());
    let bind_addr = config.bind_addr.clone();
    let throttle = Duration::from_millis(config.webhook_dispatch_throttle_ms);

    let (webhook_queue, receiver) = channel(DEFAULT_QUEUE_CAPACITY);
    let dispatcher_store = store.clone();
    let dispatcher_resend = webhook_queue.clone();
    tokio::spawn(run_dispatcher(
        dispatcher_store,
        receiver,
        dispatcher_resend,
        throttle,
    ));

    let reconcile_store = store.clone();
    let reconcile_sender = webhook_queue.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(RECONCILE_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            reconcile_undelivered(
                &reconcile_store,
                &reconcile_sender,
                Duration::from_secs(RECONCILE_STALE_AFTER_SECS),
            );
        }
    });

    let state = AppState::new(store, webhook_queue, config);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("failed to resolve bound address")?;
    tracing::info!(%local_addr, "boardctl control plane listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("boardctl server exited unexpectedly")?;

    Ok(())
}
