//! Polling primitives shared by the `/activity/task-comments/stream` and
//! `/agents/stream` SSE handlers (spec.md §4.6): a monotonic time cursor and
//! a bounded per-subscriber dedup FIFO. Kept transport-agnostic so
//! `boardctl-api` only has to wire these into `axum::response::sse`.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Advances forward only; each tick's query uses `>= last_seen`, so the
/// cursor must land on the newest `created_at`/`updated_at` seen so the next
/// tick doesn't refetch the same row range from scratch.
#[derive(Debug, Clone, Copy)]
pub struct TimeCursor {
    last_seen: DateTime<Utc>,
}

impl TimeCursor {
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self { last_seen: at }
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Moves the cursor forward to `candidate` if it's newer; never moves
    /// it backward (out-of-order delivery must not rewind the window).
    pub fn advance(&mut self, candidate: DateTime<Utc>) {
        if candidate > self.last_seen {
            self.last_seen = candidate;
        }
    }
}

/// Bounded FIFO of emitted event ids (spec.md §4.6: max 2000, oldest
/// evicted) preventing re-emission of events that share the cursor's
/// boundary instant across polls.
#[derive(Debug)]
pub struct DedupFifo {
    seen: HashSet<Uuid>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

impl DedupFifo {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Returns `true` if `id` had not been emitted yet (the caller should
    /// emit it now); `false` if it's a repeat and must be skipped.
    pub fn admit(&mut self, id: Uuid) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }
}

pub const DEFAULT_DEDUP_CAPACITY: usize = 2000;
pub const POLL_INTERVAL_SECS: u64 = 2;
pub const HEARTBEAT_INTERVAL_SECS: u64 = 15;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cursor_never_moves_backward() {
        let mut cursor = TimeCursor::starting_at(Utc::now());
        let original = cursor.last_seen();
        cursor.advance(original - Duration::seconds(5));
        assert_eq!(cursor.last_seen(), original);
        let later = original + Duration::seconds(5);
        cursor.advance(later);
        assert_eq!(cursor.last_seen(), later);
    }

    #[test]
    fn dedup_admits_each_id_once() {
        let mut fifo = DedupFifo::new(2000);
        let id = Uuid::new_v4();
        assert!(fifo.admit(id));
        assert!(!fifo.admit(id));
    }

    #[test]
    fn dedup_evicts_oldest_past_capacity() {
        let mut fifo = DedupFifo::new(2);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        assert!(fifo.admit(a));
        assert!(fifo.admit(b));
        assert!(fifo.admit(c));
        // `a` was evicted to make room for `c`, so it can be admitted again.
        assert!(fifo.admit(a));
    }
}
