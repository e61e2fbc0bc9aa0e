use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch (0 if the clock is before it).
#[must_use]
pub fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Compact human uptime: `2d 3h`, `4h 12m`, `5m 9s` or `42s`.
///
/// Only the two most significant units are shown.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let seconds = uptime.as_secs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{days}d {}h", hours % 24)
    } else if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, "0s")]
    #[case(59, "59s")]
    #[case(61, "1m 1s")]
    #[case(3_600, "1h 0m")]
    #[case(3_725, "1h 2m")]
    #[case(90_000, "1d 1h")]
    fn uptime_formatting(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(format_uptime(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn sub_second_uptime_rounds_down() {
        assert_eq!(format_uptime(Duration::from_millis(999)), "0s");
    }

    #[test]
    fn clock_is_after_epoch() {
        assert!(unix_now_ms() > 1_600_000_000_000);
        assert!(unix_now() > 1_600_000_000);
    }
}
