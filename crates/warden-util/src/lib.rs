//! Shared utilities for warden
//!
//! This crate provides:
//! - ID types (MachineId, PassId)
//! - Time utilities (wall-clock access, instant parsing, mock time)
//! - Error types
//! - Default paths for the configuration file

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
