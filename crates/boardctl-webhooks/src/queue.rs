//! The in-process delivery queue (spec.md §4.7 step 5, §5): a bounded
//! `tokio::sync::mpsc` channel. Enqueue uses `try_send` so a full queue
//! never blocks the HTTP handler that produced the 202 response; a full or
//! closed queue hands the item back so the caller can fall back to a
//! synchronous (in-request) lead notification.

use boardctl_types::model::{BoardId, WebhookId, WebhookPayloadId};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookQueueItem {
    pub board_id: BoardId,
    pub webhook_id: WebhookId,
    pub payload_id: WebhookPayloadId,
    pub received_at: DateTime<Utc>,
    pub attempts: u32,
}

impl WebhookQueueItem {
    pub fn first_attempt(
        board_id: BoardId,
        webhook_id: WebhookId,
        payload_id: WebhookPayloadId,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            board_id,
            webhook_id,
            payload_id,
            received_at,
            attempts: 0,
        }
    }

    /// Returns an item with `attempts` incremented, for requeueing after a
    /// dispatch failure.
    pub fn retried(mut self) -> Self {
        self.attempts += 1;
        self
    }
}

#[derive(Clone)]
pub struct WebhookQueueSender(mpsc::Sender<WebhookQueueItem>);

pub struct WebhookQueueReceiver(mpsc::Receiver<WebhookQueueItem>);

pub fn channel(capacity: usize) -> (WebhookQueueSender, WebhookQueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (WebhookQueueSender(tx), WebhookQueueReceiver(rx))
}

impl WebhookQueueSender {
    /// Non-blocking enqueue. `Err(item)` hands the item straight back —
    /// the queue is full or the dispatcher has shut down — so the caller
    /// can fall back to synchronous delivery.
    pub fn try_enqueue(&self, item: WebhookQueueItem) -> Result<(), WebhookQueueItem> {
        self.0.try_send(item).map_err(|err| err.into_inner())
    }
}

impl WebhookQueueReceiver {
    pub async fn recv(&mut self) -> Option<WebhookQueueItem> {
        self.0.recv().await
    }

    pub fn try_recv(&mut self) -> Result<WebhookQueueItem, mpsc::error::TryRecvError> {
        self.0.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item() -> WebhookQueueItem {
        WebhookQueueItem::first_attempt(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Utc::now())
    }

    #[tokio::test]
    async fn enqueue_then_receive_round_trips() {
        let (sender, mut receiver) = channel(4);
        let sent = item();
        sender.try_enqueue(sent.clone()).expect("enqueue");
        let received = receiver.recv().await.expect("recv");
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn full_queue_hands_the_item_back() {
        let (sender, _receiver) = channel(1);
        sender.try_enqueue(item()).expect("first fits");
        let rejected = sender.try_enqueue(item());
        assert!(rejected.is_err());
    }

    #[test]
    fn retried_increments_attempts() {
        let retried = item().retried();
        assert_eq!(retried.attempts, 1);
    }
}
