//! Machine and power-state types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use warden_util::MachineId;

/// Observed power state of a machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Running,
    Stopped,
    /// Starting or stopping; a corrective command now would race
    Transitioning,
    Unknown,
}

impl PowerState {
    /// True when the state is settled enough to act on.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Running | Self::Stopped)
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Transitioning => write!(f, "transitioning"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A corrective power command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerCommand {
    Start,
    Stop,
}

impl PowerCommand {
    /// The settled state this command converges to.
    pub fn target(&self) -> PowerState {
        match self {
            Self::Start => PowerState::Running,
            Self::Stop => PowerState::Stopped,
        }
    }
}

impl fmt::Display for PowerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// One virtual machine as enumerated from the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,

    pub resource_group: String,

    /// Tag values keyed by exact tag name
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

impl Machine {
    pub fn new(id: impl Into<MachineId>, resource_group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_group: resource_group.into(),
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    /// Look up a tag value by exact name.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_command_targets() {
        assert_eq!(PowerCommand::Start.target(), PowerState::Running);
        assert_eq!(PowerCommand::Stop.target(), PowerState::Stopped);
    }

    #[test]
    fn settled_states() {
        assert!(PowerState::Running.is_settled());
        assert!(PowerState::Stopped.is_settled());
        assert!(!PowerState::Transitioning.is_settled());
        assert!(!PowerState::Unknown.is_settled());
    }

    #[test]
    fn machine_tag_lookup_is_exact() {
        let machine = Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19");

        assert_eq!(machine.tag("AutoShutdownSchedule"), Some("8->19"));
        assert_eq!(machine.tag("autoshutdownschedule"), None);
        assert_eq!(machine.tag("NoStartSchedule"), None);
    }
}
