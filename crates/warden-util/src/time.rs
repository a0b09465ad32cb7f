//! Time utilities for warden
//!
//! All schedule evaluation takes the current instant as an explicit
//! parameter; this module is where that instant comes from at the top of a
//! reconciliation pass.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `WARDEN_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is
//! useful for exercising schedule windows without waiting for them.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2026-08-24 22:30:00`)
//!
//! Example:
//! ```bash
//! WARDEN_MOCK_TIME="2026-08-24 22:30:00" wardend --once --dry-run
//! ```

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use std::sync::OnceLock;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "WARDEN_MOCK_TIME";

/// Instant format accepted by `parse_instant` and the mock time override
pub const INSTANT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

/// Initialize the mock time offset based on the environment variable.
/// Returns the offset between mock time and real time at process start.
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Some(mock_dt) = parse_instant(&mock_time_str) {
                    let real_now = chrono::Local::now();
                    let offset = mock_dt.signed_duration_since(real_now);
                    tracing::info!(
                        mock_time = %mock_time_str,
                        offset_secs = offset.num_seconds(),
                        "Mock time enabled"
                    );
                    return Some(offset);
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = INSTANT_FORMAT,
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
///
/// In release builds, this always returns the real system time.
/// In debug builds, if `WARDEN_MOCK_TIME` is set, this returns a time
/// that advances from the mock time at the same rate as real time.
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` literal into a local instant.
///
/// Returns `None` for malformed input or a wall-clock time that does not
/// exist in the local timezone (DST gap).
pub fn parse_instant(s: &str) -> Option<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), INSTANT_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Format a DateTime for report lines.
pub fn format_instant(dt: &DateTime<Local>) -> String {
    dt.format(INSTANT_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn parse_instant_valid() {
        let dt = parse_instant("2026-08-24 22:30:00").unwrap();
        assert_eq!(dt.year(), 2026);
        assert_eq!(dt.month(), 8);
        assert_eq!(dt.day(), 24);
        assert_eq!(dt.hour(), 22);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn parse_instant_trims_whitespace() {
        assert!(parse_instant("  2026-08-24 06:00:00  ").is_some());
    }

    #[test]
    fn parse_instant_invalid_formats() {
        let invalid = [
            "2026-08-24",           // Missing time
            "22:30:00",             // Missing date
            "2026/08/24 22:30:00",  // Wrong date separator
            "2026-08-24T22:30:00",  // ISO format (not supported)
            "Aug 24, 2026 22:30",   // Wrong format
            "",                     // Empty string
            "not a date",           // Invalid string
        ];

        for s in &invalid {
            assert!(
                parse_instant(s).is_none(),
                "Expected '{}' to fail parsing, but it succeeded",
                s
            );
        }
    }

    #[test]
    fn format_instant_round_trips() {
        let dt = Local.with_ymd_and_hms(2026, 8, 24, 14, 30, 45).unwrap();
        let s = format_instant(&dt);
        assert_eq!(s, "2026-08-24 14:30:45");
        assert_eq!(parse_instant(&s).unwrap(), dt);
    }

    #[test]
    fn now_returns_reasonable_time() {
        let t = now();
        assert!(t.year() >= 2020);
        assert!(t.year() <= 2100);
    }

    #[test]
    fn mock_time_env_var_name() {
        assert_eq!(MOCK_TIME_ENV_VAR, "WARDEN_MOCK_TIME");
    }

    #[test]
    fn mock_time_offset_calculation() {
        // The offset applied to the real clock should land on the mock time.
        let mock_dt = parse_instant("2026-08-24 14:30:00").unwrap();
        let real_now = chrono::Local::now();

        let offset = mock_dt.signed_duration_since(real_now);
        let simulated_now = real_now + offset;

        let diff = (simulated_now - mock_dt).num_seconds().abs();
        assert!(
            diff <= 1,
            "Expected simulated time within 1 second of mock time, got {} seconds",
            diff
        );
    }
}
