//! Pass reports — the operator-facing audit stream
//!
//! One line per machine per pass, plus one line per invalid schedule entry.
//! The same data serializes to JSON for machine consumption.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use warden_cloud::PowerState;
use warden_schedule::{DesiredState, EntryWarning};
use warden_util::{MachineId, PassId};

/// What happened to one machine during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MachineOutcome {
    /// Already in the desired state; no action needed
    Converged,
    /// Start command issued and verified
    Started,
    /// Stop command issued and verified
    Stopped,
    /// Dry-run: a start would have been issued
    WouldStart,
    /// Dry-run: a stop would have been issued
    WouldStop,
    /// No applicable schedule; machine left untouched
    Untouched,
    /// The observed state made action unsafe this pass
    Skipped { reason: String },
    /// A command was attempted but the machine did not reach the desired
    /// state within the verification window
    Failed { detail: String },
}

impl MachineOutcome {
    /// True when this outcome represents an issued (non-dry-run) action.
    pub fn is_action(&self) -> bool {
        matches!(self, Self::Started | Self::Stopped)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for MachineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::WouldStart => write!(f, "would-start"),
            Self::WouldStop => write!(f, "would-stop"),
            Self::Untouched => write!(f, "untouched"),
            Self::Skipped { reason } => write!(f, "skipped ({reason})"),
            Self::Failed { detail } => write!(f, "failed ({detail})"),
        }
    }
}

/// One machine's line in the pass report
#[derive(Debug, Clone, Serialize)]
pub struct MachineReport {
    pub machine: MachineId,
    pub resource_group: String,

    /// Desired state, or `None` when no schedule applied
    pub desired: Option<DesiredState>,

    /// Observed state, or `None` when it was never queried
    pub observed: Option<PowerState>,

    pub outcome: MachineOutcome,

    /// The schedule entry that determined the decision, if any
    pub matched_entry: Option<String>,

    /// Schedule entries that failed to parse on this machine
    pub warnings: Vec<EntryWarning>,
}

impl fmt::Display for MachineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.machine, self.resource_group)?;
        match self.desired {
            Some(desired) => write!(f, " desired={desired}")?,
            None => write!(f, " desired=-")?,
        }
        match self.observed {
            Some(observed) => write!(f, " observed={observed}")?,
            None => write!(f, " observed=-")?,
        }
        write!(f, " outcome={}", self.outcome)?;
        if let Some(entry) = &self.matched_entry {
            write!(f, " entry='{entry}'")?;
        }
        for warning in &self.warnings {
            write!(
                f,
                "\n  warning: invalid {} entry '{}': {}",
                warning.tag, warning.entry, warning.reason
            )?;
        }
        Ok(())
    }
}

/// Full record of one reconciliation pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub pass_id: PassId,
    pub evaluated_at: DateTime<Local>,
    pub dry_run: bool,
    pub machines: Vec<MachineReport>,
}

impl PassReport {
    pub fn actions_taken(&self) -> usize {
        self.machines.iter().filter(|m| m.outcome.is_action()).count()
    }

    pub fn failures(&self) -> usize {
        self.machines.iter().filter(|m| m.outcome.is_failure()).count()
    }

    pub fn warnings(&self) -> usize {
        self.machines.iter().map(|m| m.warnings.len()).sum()
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "pass {} at {}{}: {} machines, {} actions, {} failures, {} warnings",
            self.pass_id,
            warden_util::format_instant(&self.evaluated_at),
            if self.dry_run { " (dry-run)" } else { "" },
            self.machines.len(),
            self.actions_taken(),
            self.failures(),
            self.warnings(),
        )?;
        for machine in &self.machines {
            writeln!(f, "{machine}")?;
        }
        Ok(())
    }
}
