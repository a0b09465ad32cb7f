//! Cloud control-plane interface for warden
//!
//! This crate defines the capability-based boundary between the reconciler
//! and whatever actually runs the machines. It contains no cloud SDK code;
//! live adapters implement [`CloudProvider`] out of tree. The in-memory
//! provider doubles as the test fake and as the simulation backend behind
//! fleet files.

mod fleet;
mod memory;
mod traits;
mod types;

pub use fleet::*;
pub use memory::*;
pub use traits::*;
pub use types::*;
