//! Schedule evaluation core for warden
//!
//! A machine carries up to two tag-encoded schedules:
//! - a deny-start schedule: windows during which the machine must not run
//! - an allow-start schedule: windows during which the machine should run
//!
//! Each tag value is a comma-separated list of entries (time range, weekday
//! name, or calendar date). This crate resolves entries to concrete time
//! windows relative to an explicit evaluation instant and combines the two
//! schedules into a single desired power state, with an active deny window
//! always taking precedence.
//!
//! Everything here is pure: no clock reads, no I/O.

mod entry;
mod resolve;
mod window;

pub use entry::*;
pub use resolve::*;
pub use window::*;
