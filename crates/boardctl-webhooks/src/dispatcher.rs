//! Worker dispatcher (spec.md §4.7 "Worker dispatcher" paragraph): drains
//! the delivery queue with a configurable per-item throttle, resolves the
//! board lead and its gateway, and sends a structured instruction to the
//! lead's session. Failures requeue with a capped retry count; success is
//! recorded as a `webhook.dispatch.success` activity event so the
//! reconciliation sweep can tell delivered payloads apart from stale ones.

use std::sync::Arc;
use std::time::Duration;

use boardctl_core::ids::new_id;
use boardctl_core::Store;
use boardctl_gateway::{GatewayClient, GatewayClientConfig, GatewayCoordinator};
use boardctl_provision::session::session_key;
use boardctl_types::model::ActivityEvent;
use chrono::Utc;
use tracing::{info, warn};

use crate::ingest::payload_preview;
use crate::queue::{WebhookQueueItem, WebhookQueueReceiver, WebhookQueueSender};

pub const MAX_DISPATCH_ATTEMPTS: u32 = 5;
const PAYLOAD_PREVIEW_LEN: usize = 200;
const GATEWAY_CALL_TIMEOUT_MS: u64 = 20_000;

/// Runs until every `WebhookQueueSender` is dropped. Intended to be spawned
/// as a long-lived tokio task alongside the HTTP server.
pub async fn run_dispatcher(
    store: Arc<Store>,
    mut receiver: WebhookQueueReceiver,
    resend: WebhookQueueSender,
    throttle: Duration,
) {
    while let Some(item) = receiver.recv().await {
        dispatch_one(&store, item, &resend).await;
        tokio::time::sleep(throttle).await;
    }
}

async fn dispatch_one(store: &Store, item: WebhookQueueItem, resend: &WebhookQueueSender) {
    let payload_id = item.payload_id;
    let attempts = item.attempts;
    match try_dispatch(store, &item).await {
        Ok(()) => info!(%payload_id, "webhook payload dispatched"),
        Err(reason) => {
            warn!(%payload_id, attempts, %reason, "webhook dispatch failed");
            if attempts + 1 < MAX_DISPATCH_ATTEMPTS {
                let _ = resend.try_enqueue(item.retried());
            } else {
                warn!(%payload_id, "webhook payload exhausted retry budget");
            }
        }
    }
}

async fn try_dispatch(store: &Store, item: &WebhookQueueItem) -> Result<(), String> {
    let board = store.get_board(item.board_id).ok_or("board not found")?;
    let webhook = store
        .get_webhook(item.webhook_id)
        .ok_or("webhook not found")?;
    let payload = store
        .get_webhook_payload(item.payload_id)
        .ok_or("payload not found")?;
    let lead = store
        .find_board_lead(item.board_id)
        .ok_or("board has no lead agent")?;
    let gateway_id = board.gateway_id.ok_or("board has no gateway")?;
    let gateway = store.get_gateway(gateway_id).ok_or("gateway not found")?;
    if !gateway.is_provisionable() {
        return Err("gateway is not provisionable".to_string());
    }

    let client = GatewayClient::new(GatewayClientConfig {
        base_url: gateway.url.unwrap_or_default(),
        token: gateway.token,
        request_timeout_ms: GATEWAY_CALL_TIMEOUT_MS,
    })
    .map_err(|err| err.to_string())?;
    let coordinator = GatewayCoordinator::new(client);

    let lead_session = session_key(&lead);
    let preview = payload_preview(&payload.payload, PAYLOAD_PREVIEW_LEN);
    let instruction = format!(
        "WEBHOOK DELIVERY (webhook_id={}, payload_id={})\n\n{preview}\n\n\
         Inspect the full payload at /api/v1/boards/{}/webhooks/{}/payloads/{}.",
        webhook.id, payload.id, board.id, webhook.id, payload.id,
    );

    coordinator
        .nudge_agent(&lead_session, &instruction)
        .await
        .map_err(|err| err.to_string())?;

    store.append_activity(ActivityEvent {
        id: new_id(),
        org_id: board.org_id,
        board_id: Some(board.id),
        event_type: "webhook.dispatch.success".to_string(),
        task_id: None,
        agent_id: Some(lead.id),
        message: format!("delivered webhook payload {}", payload.id),
        created_at: Utc::now(),
    });

    Ok(())
}

/// Reconciliation sweep (spec.md §2/§4.7, SPEC_FULL §4.7): re-enqueues
/// payloads older than `older_than` with no recorded
/// `webhook.dispatch.success`, once per sweep call.
pub fn reconcile_undelivered(store: &Store, sender: &WebhookQueueSender, older_than: Duration) {
    let threshold = Utc::now()
        - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());
    for payload in store.list_undelivered_payloads_older_than(threshold) {
        let item = WebhookQueueItem::first_attempt(
            payload.board_id,
            payload.webhook_id,
            payload.id,
            payload.received_at,
        );
        let _ = sender.try_enqueue(item);
    }
}
