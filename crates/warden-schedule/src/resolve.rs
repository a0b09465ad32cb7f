//! Per-machine schedule resolution
//!
//! Combines a machine's deny-start and allow-start tags into one desired
//! power state. An active deny window always wins and suppresses evaluation
//! of the allow tag entirely; a machine with no applicable schedule gets no
//! decision and is left untouched.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::{resolve_entry, split_entries, EntryParseError};

/// Target power state computed for one machine at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredState {
    Running,
    Stopped,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Which of the two schedule tags an entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleTagKind {
    DenyStart,
    AllowStart,
}

impl fmt::Display for ScheduleTagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DenyStart => write!(f, "deny-start"),
            Self::AllowStart => write!(f, "allow-start"),
        }
    }
}

/// A schedule entry that failed to parse, attributed to its tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryWarning {
    pub tag: ScheduleTagKind,
    pub entry: String,
    pub reason: String,
}

impl EntryWarning {
    fn new(tag: ScheduleTagKind, error: EntryParseError) -> Self {
        Self {
            tag,
            entry: error.entry,
            reason: error.reason,
        }
    }
}

/// Why the resolver reached its verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// A deny-start window contains the evaluation instant
    DenyActive { entry: String },
    /// An allow-start window contains the evaluation instant
    AllowMatched { entry: String },
    /// The allow tag is present but no entry matched
    NoAllowMatched,
    /// No applicable schedule; the machine is left untouched
    NoSchedule,
}

/// Outcome of resolving one machine's schedule tags at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Target state, or `None` when the machine carries no applicable schedule
    pub desired: Option<DesiredState>,
    pub verdict: Verdict,
    /// One warning per entry that failed to parse
    pub warnings: Vec<EntryWarning>,
}

impl Resolution {
    /// The entry that determined the outcome, if any.
    pub fn matched_entry(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::DenyActive { entry } | Verdict::AllowMatched { entry } => Some(entry),
            _ => None,
        }
    }
}

/// True when a deny-start entry's window contains `now`, meaning the machine
/// must not be started at this instant.
pub fn deny_blocks_start(entry: &str, now: &DateTime<Local>) -> Result<bool, EntryParseError> {
    Ok(matches!(resolve_entry(entry, now)?, Some(w) if w.contains(now)))
}

/// True when an allow-start entry's window contains `now`, meaning the
/// machine should be running at this instant.
pub fn allow_wants_running(entry: &str, now: &DateTime<Local>) -> Result<bool, EntryParseError> {
    Ok(matches!(resolve_entry(entry, now)?, Some(w) if w.contains(now)))
}

/// Resolve a machine's two schedule tags into a desired power state.
///
/// Evaluation order and precedence:
/// 1. Deny-start entries, in order. The first active window decides
///    `Stopped` and the allow tag is never evaluated.
/// 2. Allow-start entries, in order. The first active window decides
///    `Running`; if none matches, the allow tag decides `Stopped`.
/// 3. With no allow tag (and no active deny window), there is no decision.
///
/// An entry that fails to parse is treated as non-matching and recorded as
/// a warning; it never aborts evaluation of sibling entries.
pub fn resolve_schedules(
    deny_tag: Option<&str>,
    allow_tag: Option<&str>,
    now: &DateTime<Local>,
) -> Resolution {
    let mut warnings = Vec::new();

    if let Some(tag) = deny_tag {
        for entry in split_entries(tag) {
            match deny_blocks_start(entry, now) {
                Ok(true) => {
                    debug!(entry, "Deny-start window active");
                    return Resolution {
                        desired: Some(DesiredState::Stopped),
                        verdict: Verdict::DenyActive {
                            entry: entry.to_string(),
                        },
                        warnings,
                    };
                }
                Ok(false) => {}
                Err(e) => warnings.push(EntryWarning::new(ScheduleTagKind::DenyStart, e)),
            }
        }
    }

    if let Some(tag) = allow_tag {
        for entry in split_entries(tag) {
            match allow_wants_running(entry, now) {
                Ok(true) => {
                    debug!(entry, "Allow-start window active");
                    return Resolution {
                        desired: Some(DesiredState::Running),
                        verdict: Verdict::AllowMatched {
                            entry: entry.to_string(),
                        },
                        warnings,
                    };
                }
                Ok(false) => {}
                Err(e) => warnings.push(EntryWarning::new(ScheduleTagKind::AllowStart, e)),
            }
        }
        return Resolution {
            desired: Some(DesiredState::Stopped),
            verdict: Verdict::NoAllowMatched,
            warnings,
        };
    }

    Resolution {
        desired: None,
        verdict: Verdict::NoSchedule,
        warnings,
    }
}
