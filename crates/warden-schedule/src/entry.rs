//! Schedule entry parsing and window resolution
//!
//! A schedule tag value is a comma-separated list of entries. Each entry is
//! classified in this order:
//! 1. Range: `"<start>-><end>"`, e.g. `"22:00->06:00"` or `"8->19"`
//! 2. Weekday: a full English weekday name, e.g. `"Sunday"`
//! 3. Date: a calendar date or date-time, e.g. `"December 25"` or
//!    `"2026-12-25 14:00"`; a date-time counts as its calendar date
//!
//! The order is significant: `->` always wins, and a weekday name is never
//! re-interpreted as a date. Entries that parse as none of the three forms
//! are errors; a weekday name that simply is not today resolves to no window
//! and is not an error.

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use thiserror::Error;

use crate::ResolvedWindow;

/// Separator between the two halves of a range entry
pub const RANGE_SEPARATOR: &str = "->";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// A schedule entry that could not be parsed as a range, weekday, or date
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("invalid schedule entry '{entry}': {reason}")]
pub struct EntryParseError {
    /// The offending entry, trimmed
    pub entry: String,
    /// Why it failed to parse
    pub reason: String,
}

impl EntryParseError {
    fn new(entry: &str, reason: impl Into<String>) -> Self {
        Self {
            entry: entry.to_string(),
            reason: reason.into(),
        }
    }
}

/// Split a schedule tag value into trimmed, non-empty entries.
pub fn split_entries(tag: &str) -> impl Iterator<Item = &str> {
    tag.split(',').map(str::trim).filter(|e| !e.is_empty())
}

/// Resolve one schedule entry to its time window relative to `now`.
///
/// Returns `Ok(None)` when the entry is well-formed but produces no window
/// at this instant (a weekday name that is not today's weekday). Returns an
/// error only when the entry fails to parse as any of the three forms.
pub fn resolve_entry(
    entry: &str,
    now: &DateTime<Local>,
) -> Result<Option<ResolvedWindow>, EntryParseError> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err(EntryParseError::new(entry, "empty entry"));
    }

    if let Some((lhs, rhs)) = entry.split_once(RANGE_SEPARATOR) {
        return resolve_range(entry, lhs.trim(), rhs.trim(), now).map(Some);
    }

    if let Some(weekday) = parse_weekday(entry) {
        if weekday == now.weekday() {
            return full_day_window(entry, now.date_naive()).map(Some);
        }
        return Ok(None);
    }

    if let Some(date) = parse_date_literal(entry, now.date_naive()) {
        return full_day_window(entry, date).map(Some);
    }

    Err(EntryParseError::new(
        entry,
        "not a time range, weekday name, or calendar date",
    ))
}

/// Resolve a `start->end` range into one coherent ordered window.
fn resolve_range(
    entry: &str,
    lhs: &str,
    rhs: &str,
    now: &DateTime<Local>,
) -> Result<ResolvedWindow, EntryParseError> {
    let mut start = parse_instant_literal(lhs, now)
        .ok_or_else(|| EntryParseError::new(entry, format!("unparseable range start '{lhs}'")))?;
    let mut end = parse_instant_literal(rhs, now)
        .ok_or_else(|| EntryParseError::new(entry, format!("unparseable range end '{rhs}'")))?;

    if start > end {
        // The range crosses midnight. Pick the one window that can contain
        // `now`: tonight into tomorrow when `now` has passed the start,
        // otherwise yesterday evening into this morning.
        let boundary = next_midnight(entry, now)?;
        if *now >= start && *now < boundary {
            end = end
                .checked_add_signed(Duration::days(1))
                .ok_or_else(|| EntryParseError::new(entry, "range end out of range"))?;
        } else {
            start = start
                .checked_sub_signed(Duration::days(1))
                .ok_or_else(|| EntryParseError::new(entry, "range start out of range"))?;
        }
    }

    Ok(ResolvedWindow::new(start, end))
}

/// Start of the calendar day after `now`, in local time.
fn next_midnight(entry: &str, now: &DateTime<Local>) -> Result<DateTime<Local>, EntryParseError> {
    let tomorrow = now
        .date_naive()
        .succ_opt()
        .ok_or_else(|| EntryParseError::new(entry, "date out of range"))?;
    let naive = tomorrow
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| EntryParseError::new(entry, "date out of range"))?;
    to_local(naive).ok_or_else(|| EntryParseError::new(entry, "midnight does not exist in local time"))
}

/// The `[00:00:00, 23:59:59]` window of a calendar day.
///
/// Full-day windows deliberately end at 23:59:59; the final second before
/// midnight lies outside every full-day window.
fn full_day_window(entry: &str, date: NaiveDate) -> Result<ResolvedWindow, EntryParseError> {
    let start = date
        .and_hms_opt(0, 0, 0)
        .and_then(to_local)
        .ok_or_else(|| EntryParseError::new(entry, "day start does not exist in local time"))?;
    let end = date
        .and_hms_opt(23, 59, 59)
        .and_then(to_local)
        .ok_or_else(|| EntryParseError::new(entry, "day end does not exist in local time"))?;
    Ok(ResolvedWindow::new(start, end))
}

fn to_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    // `earliest` picks the first valid instant when a DST transition makes
    // the wall-clock time ambiguous.
    Local.from_local_datetime(&naive).earliest()
}

/// Parse one side of a range entry into an absolute local instant.
///
/// A bare time of day is anchored to the date of `now`; a bare date is
/// anchored to midnight of that date.
fn parse_instant_literal(s: &str, now: &DateTime<Local>) -> Option<DateTime<Local>> {
    if let Some(time) = parse_time_literal(s) {
        return to_local(now.date_naive().and_time(time));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return to_local(dt);
        }
    }

    let date = parse_date_literal(s, now.date_naive())?;
    to_local(date.and_hms_opt(0, 0, 0)?)
}

/// Parse a time-of-day literal: `8`, `8:30`, `08:30:15`, `8pm`, `8:30 PM`.
fn parse_time_literal(s: &str) -> Option<NaiveTime> {
    let lower = s.trim().to_ascii_lowercase();

    let (body, is_pm) = if let Some(rest) = lower.strip_suffix("am") {
        (rest.trim_end(), Some(false))
    } else if let Some(rest) = lower.strip_suffix("pm") {
        (rest.trim_end(), Some(true))
    } else {
        (lower.as_str(), None)
    };

    let parts: Vec<&str> = body.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let mut hour: u32 = parts[0].parse().ok()?;
    let minute: u32 = if parts.len() > 1 { parts[1].parse().ok()? } else { 0 };
    let second: u32 = if parts.len() > 2 { parts[2].parse().ok()? } else { 0 };

    if let Some(pm) = is_pm {
        // 12-hour clock: 12am is midnight, 12pm is noon
        if hour == 0 || hour > 12 {
            return None;
        }
        if pm && hour != 12 {
            hour += 12;
        } else if !pm && hour == 12 {
            hour = 0;
        }
    }

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Parse a calendar date literal. Year-less forms anchor to the year of
/// `today`; a date-time literal counts as its calendar date.
fn parse_date_literal(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d %Y", "%B %d, %Y", "%d %B %Y"];
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    // Year-less forms: "December 25", "25 December"
    let with_year = format!("{} {}", s, today.year());
    for fmt in ["%B %d %Y", "%B %d, %Y", "%d %B %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, fmt) {
            return Some(date);
        }
    }

    None
}

/// Parse a full English weekday name, case-insensitively.
fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
