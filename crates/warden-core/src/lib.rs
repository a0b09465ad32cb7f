//! Reconciliation engine for warden
//!
//! One pass over the fleet: enumerate machines, resolve each machine's
//! schedule tags at the pass instant, compare the desired power state to
//! the observed one, and issue the minimal corrective action. Per-machine
//! failures degrade that machine only; enumeration and auth failures abort
//! the pass.

mod reconciler;
mod report;

pub use reconciler::*;
pub use report::*;
