use std::sync::atomic::{AtomicU64, Ordering};

/// Markers for gateway errors that are worth retrying (connection drops,
/// transient HTTP 5xx, restarts). Verbatim from the production corpus of
/// error strings actually observed, so the classifier does not start
/// silently retrying a permanent failure.
const TRANSIENT_MARKERS: &[&str] = &[
    "connect call failed",
    "connection refused",
    "errno 111",
    "econnrefused",
    "did not receive a valid http response",
    "no route to host",
    "network is unreachable",
    "host is down",
    "name or service not known",
    "received 1012",
    "service restart",
    "http 503",
    "http 502",
    "http 504",
    "temporar",
    "timeout",
    "timed out",
    "connection closed",
    "connection reset",
];

/// Markers that override a transient-looking message back to fatal, e.g.
/// `"unsupported file"` from a file-set call that will never succeed on
/// retry.
const NON_TRANSIENT_MARKERS: &[&str] = &["unsupported file"];

/// Mirrors `_is_transient_gateway_error`: a `503` alongside `websocket` is
/// treated as transient even without matching the substring table.
pub fn is_transient_gateway_error(message: &str) -> bool {
    let message = message.to_lowercase();
    if message.is_empty() {
        return false;
    }
    if NON_TRANSIENT_MARKERS.iter().any(|m| message.contains(m)) {
        return false;
    }
    (message.contains("503") && message.contains("websocket"))
        || TRANSIENT_MARKERS.iter().any(|m| message.contains(m))
}

static JITTER_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Bounded jitter in `[1 - jitter, 1 + jitter]` applied multiplicatively to
/// a delay, using a counter-based pseudo-random mix rather than pulling in
/// a dedicated RNG crate for one call site.
fn jitter_factor(jitter: f64) -> f64 {
    if jitter <= 0.0 {
        return 1.0;
    }
    let seed = JITTER_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17) ^ 0xA24B_AED4_963E_E407;
    let unit = (mixed % 2_000_001) as f64 / 1_000_000.0 - 1.0; // [-1.0, 1.0]
    1.0 + unit * jitter
}

/// Gateway-call retry policy: a deadline-bounded exponential backoff with
/// jitter, grounded on the template-sync reconciliation loop's timeout.
#[derive(Debug, Clone, Copy)]
pub struct GatewayBackoff {
    pub timeout_ms: u64,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: f64,
}

impl Default for GatewayBackoff {
    fn default() -> Self {
        Self {
            timeout_ms: 10 * 60 * 1000,
            base_delay_ms: 750,
            max_delay_ms: 30_000,
            jitter: 0.2,
        }
    }
}

impl GatewayBackoff {
    /// Computes the next sleep duration given the current delay and time
    /// remaining before the deadline. Returns `None` once the deadline has
    /// passed (caller should raise a timeout).
    pub fn next_sleep_ms(&self, current_delay_ms: u64, remaining_ms: u64) -> Option<u64> {
        if remaining_ms == 0 {
            return None;
        }
        let bounded = current_delay_ms.min(remaining_ms);
        let jittered = (bounded as f64 * jitter_factor(self.jitter))
            .round()
            .max(0.0) as u64;
        Some(jittered.min(remaining_ms))
    }

    pub fn grow(&self, current_delay_ms: u64) -> u64 {
        current_delay_ms.saturating_mul(2).min(self.max_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_markers_match_case_insensitively() {
        assert!(is_transient_gateway_error("Connection Refused"));
        assert!(is_transient_gateway_error("HTTP 503 from gateway"));
        assert!(is_transient_gateway_error("503 during websocket upgrade"));
        assert!(!is_transient_gateway_error(""));
    }

    #[test]
    fn unsupported_file_overrides_transient_looking_message() {
        assert!(!is_transient_gateway_error(
            "timeout: unsupported file type for agents.files.set"
        ));
    }

    #[test]
    fn unrelated_errors_are_not_transient() {
        assert!(!is_transient_gateway_error("missing scope: agents.write"));
        assert!(!is_transient_gateway_error("invalid argument"));
    }

    #[test]
    fn backoff_grows_exponentially_up_to_max() {
        let backoff = GatewayBackoff::default();
        let mut delay = backoff.base_delay_ms;
        for _ in 0..10 {
            delay = backoff.grow(delay);
        }
        assert_eq!(delay, backoff.max_delay_ms);
    }

    #[test]
    fn next_sleep_respects_remaining_budget() {
        let backoff = GatewayBackoff::default();
        let sleep = backoff.next_sleep_ms(5_000, 100).expect("sleep");
        assert!(sleep <= 100);
        assert_eq!(backoff.next_sleep_ms(5_000, 0), None);
    }
}
