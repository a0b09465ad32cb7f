//! Fleet file loading for the simulation provider
//!
//! A fleet file describes machines, their tags, and their initial power
//! states in TOML. `wardend` loads one into a [`MemoryCloud`] when no live
//! provider is wired in.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

use crate::{Machine, MemoryCloud, PowerState};

/// Fleet file errors
#[derive(Debug, Error)]
pub enum FleetError {
    #[error("Failed to read fleet file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Machine has an empty id")]
    EmptyMachineId,

    #[error("Duplicate machine id: {0}")]
    DuplicateMachineId(String),
}

pub type FleetResult<T> = Result<T, FleetError>;

/// Raw fleet file as parsed from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawFleet {
    #[serde(default)]
    pub machines: Vec<RawMachine>,
}

/// One machine definition in a fleet file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawMachine {
    pub id: String,

    #[serde(default = "default_resource_group")]
    pub resource_group: String,

    #[serde(default)]
    pub tags: HashMap<String, String>,

    /// Initial observed state (default: stopped)
    #[serde(default = "default_power_state")]
    pub power_state: PowerState,
}

fn default_resource_group() -> String {
    "default".to_string()
}

fn default_power_state() -> PowerState {
    PowerState::Stopped
}

/// Load a fleet file into an in-memory provider.
pub fn load_fleet(path: impl AsRef<Path>) -> FleetResult<MemoryCloud> {
    let content = std::fs::read_to_string(path)?;
    parse_fleet(&content)
}

/// Parse a fleet definition from a TOML string.
pub fn parse_fleet(content: &str) -> FleetResult<MemoryCloud> {
    let raw: RawFleet = toml::from_str(content)?;

    let mut seen = HashSet::new();
    let cloud = MemoryCloud::new();

    for raw_machine in raw.machines {
        if raw_machine.id.is_empty() {
            return Err(FleetError::EmptyMachineId);
        }
        if !seen.insert(raw_machine.id.clone()) {
            return Err(FleetError::DuplicateMachineId(raw_machine.id));
        }

        let machine = Machine {
            id: raw_machine.id.into(),
            resource_group: raw_machine.resource_group,
            tags: raw_machine.tags,
        };
        cloud.insert(machine, raw_machine.power_state);
    }

    Ok(cloud)
}
