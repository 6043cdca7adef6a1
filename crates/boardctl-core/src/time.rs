use chrono::{DateTime, Utc};

/// Returns the current UTC instant. Centralized so request handlers never call
/// `Utc::now()` directly, keeping "now" swappable for tests.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Returns true once `deadline` has passed relative to `at`.
pub fn is_past(deadline: DateTime<Utc>, at: DateTime<Utc>) -> bool {
    deadline <= at
}

/// Minutes elapsed between two instants, saturating at zero.
pub fn minutes_since(earlier: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (at - earlier).num_minutes().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn minutes_since_never_goes_negative() {
        let now = now();
        assert_eq!(minutes_since(now + Duration::minutes(5), now), 0);
    }

    #[test]
    fn is_past_true_at_exact_deadline() {
        let now = now();
        assert!(is_past(now, now));
        assert!(!is_past(now + Duration::seconds(1), now));
    }
}
