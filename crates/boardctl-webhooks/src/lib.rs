//! Webhook ingestion and delivery (spec.md §4.7): decoding an inbound POST
//! into a stored payload and memory row, a bounded in-process delivery
//! queue, and the worker dispatcher that notifies a board's lead agent
//! over the gateway.

pub mod dispatcher;
pub mod ingest;
pub mod queue;

pub use dispatcher::{reconcile_undelivered, run_dispatcher, MAX_DISPATCH_ATTEMPTS};
pub use ingest::{capture_headers, decode_body, ingest, IngestedWebhook};
pub use queue::{
    channel, WebhookQueueItem, WebhookQueueReceiver, WebhookQueueSender, DEFAULT_QUEUE_CAPACITY,
};
