//! Resolved time windows

use chrono::{DateTime, Local};

/// The concrete absolute interval a schedule entry maps to, relative to the
/// evaluation instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWindow {
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
}

impl ResolvedWindow {
    pub fn new(start: DateTime<Local>, end: DateTime<Local>) -> Self {
        Self { start, end }
    }

    /// Membership is inclusive on both ends.
    pub fn contains(&self, instant: &DateTime<Local>) -> bool {
        *instant >= self.start && *instant <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let start = Local.with_ymd_and_hms(2026, 8, 24, 8, 0, 0).unwrap();
        let end = Local.with_ymd_and_hms(2026, 8, 24, 19, 0, 0).unwrap();
        let window = ResolvedWindow::new(start, end);

        assert!(window.contains(&start));
        assert!(window.contains(&end));
        assert!(window.contains(&Local.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap()));

        assert!(!window.contains(&Local.with_ymd_and_hms(2026, 8, 24, 7, 59, 59).unwrap()));
        assert!(!window.contains(&Local.with_ymd_and_hms(2026, 8, 24, 19, 0, 1).unwrap()));
    }
}
