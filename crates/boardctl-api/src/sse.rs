//! Shared builder for the polling SSE endpoints (spec.md §4.6): every
//! stream handler supplies a `poll` closure over the store and this module
//! owns the cursor/dedup/heartbeat mechanics, mirroring the teacher's
//! unbounded-channel-plus-`UnboundedReceiverStream` SSE wiring
//! (`gateway_openresponses/external_agent_runtime.rs`), generalized from a
//! one-shot event drain to a continuous poll loop.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use boardctl_board::sse::{
    DedupFifo, TimeCursor, DEFAULT_DEDUP_CAPACITY, HEARTBEAT_INTERVAL_SECS, POLL_INTERVAL_SECS,
};
use chrono::{DateTime, Utc};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// One candidate row surfaced by a poll closure; `id` feeds the dedup FIFO,
/// `at` advances the cursor.
pub struct PolledEvent {
    pub at: DateTime<Utc>,
    pub id: Uuid,
    pub event_name: &'static str,
    pub payload: Value,
}

/// Builds the SSE response for a `/stream` endpoint. `poll` is invoked every
/// [`POLL_INTERVAL_SECS`] with the cursor's current watermark and must
/// return every row with `at >= since`; this function is responsible for
/// cursor advancement, dedup, and the idle heartbeat comment.
pub fn polling_sse_stream<F>(
    since: DateTime<Utc>,
    poll: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    F: Fn(DateTime<Utc>) -> Vec<PolledEvent> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    tokio::spawn(async move {
        let mut cursor = TimeCursor::starting_at(since);
        let mut dedup = DedupFifo::new(DEFAULT_DEDUP_CAPACITY);
        let mut idle_secs = 0u64;
        let mut interval = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let mut emitted = false;
            for candidate in poll(cursor.last_seen()) {
                cursor.advance(candidate.at);
                if !dedup.admit(candidate.id) {
                    continue;
                }
                let Ok(event) = Event::default()
                    .event(candidate.event_name)
                    .json_data(candidate.payload)
                else {
                    continue;
                };
                if tx.send(event).is_err() {
                    return;
                }
                emitted = true;
            }
            if emitted {
                idle_secs = 0;
                continue;
            }
            idle_secs += POLL_INTERVAL_SECS;
            if idle_secs >= HEARTBEAT_INTERVAL_SECS {
                idle_secs = 0;
                if tx.send(Event::default().comment("heartbeat")).is_err() {
                    return;
                }
            }
        }
    });

    let stream = UnboundedReceiverStream::new(rx).map(Ok);
    Sse::new(stream).keep_alive(KeepAlive::default())
}
