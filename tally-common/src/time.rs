//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix milliseconds (storage format for timestamps)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Start of a trailing window ending at `at`, as Unix milliseconds
pub fn window_start_millis(at: DateTime<Utc>, window: std::time::Duration) -> i64 {
    Duration::from_std(window)
        .ok()
        .and_then(|window| at.checked_sub_signed(window))
        .map(|start| start.timestamp_millis())
        .unwrap_or(i64::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_window_start_subtracts_window() {
        let at = Utc.timestamp_millis_opt(1_700_000_060_000).unwrap();
        let start = window_start_millis(at, std::time::Duration::from_secs(60));
        assert_eq!(start, 1_700_000_000_000);
    }

    #[test]
    fn test_window_start_huge_window_saturates() {
        let at = Utc.timestamp_millis_opt(1_000).unwrap();
        let start = window_start_millis(at, std::time::Duration::from_secs(u64::MAX));
        assert_eq!(start, i64::MIN);
    }
}
