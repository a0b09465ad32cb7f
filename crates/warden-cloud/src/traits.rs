//! Cloud provider trait

use async_trait::async_trait;
use thiserror::Error;
use warden_util::{MachineId, WardenError};

use crate::{Machine, PowerCommand, PowerState};

/// Errors from cloud provider operations
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Machine not found: {0}")]
    MachineNotFound(MachineId),

    #[error("Power request failed: {0}")]
    Request(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CloudResult<T> = Result<T, CloudError>;

impl From<CloudError> for WardenError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Enumeration(msg) => WardenError::Enumeration(msg),
            CloudError::Auth(msg) => WardenError::Auth(msg),
            CloudError::MachineNotFound(id) => WardenError::MachineNotFound(id),
            other => WardenError::CloudError(other.to_string()),
        }
    }
}

/// Control-plane interface consumed by the reconciler.
///
/// `request_power` is idempotent best-effort: starting a running machine or
/// stopping a stopped one is a no-op, and completion is asynchronous — the
/// caller re-polls `power_state` to observe convergence.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Enumerate the fleet with tag values.
    async fn list_machines(&self) -> CloudResult<Vec<Machine>>;

    /// Current observed power state of one machine.
    async fn power_state(&self, id: &MachineId) -> CloudResult<PowerState>;

    /// Request a power transition.
    async fn request_power(&self, id: &MachineId, command: PowerCommand) -> CloudResult<()>;
}
