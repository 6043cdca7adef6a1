use std::sync::Arc;

use boardctl_core::{ControlPlaneConfig, Store};
use boardctl_webhooks::WebhookQueueSender;

/// Shared request-handler state: the store guard is borrowed per-request,
/// never held across an `.await` on gateway I/O (spec.md §5). `Clone` is
/// cheap — every field is already `Arc`-backed or a cloneable channel
/// handle, matching axum's per-request `State<S>` extraction.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub webhook_queue: WebhookQueueSender,
    pub config: Arc<ControlPlaneConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<Store>,
        webhook_queue: WebhookQueueSender,
        config: ControlPlaneConfig,
    ) -> Self {
        Self {
            store,
            webhook_queue,
            config: Arc::new(config),
        }
    }
}
