//! In-memory cloud provider
//!
//! Serves two purposes: the test double for the reconciler, and the
//! simulation backend `wardend` runs against when given a fleet file.
//! Failure knobs let tests exercise every branch of the error taxonomy.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use warden_util::MachineId;

use crate::{CloudError, CloudProvider, CloudResult, Machine, PowerCommand, PowerState};

#[derive(Debug, Clone)]
struct MachineRecord {
    machine: Machine,
    state: PowerState,
}

/// In-memory cloud provider for tests and simulation
#[derive(Default)]
pub struct MemoryCloud {
    // BTreeMap keeps enumeration order stable across passes
    machines: Mutex<BTreeMap<MachineId, MachineRecord>>,

    /// Every power command received, in order
    commands: Mutex<Vec<(MachineId, PowerCommand)>>,

    /// Machines that accept commands but never change state
    stuck: Mutex<HashSet<MachineId>>,

    /// Configure enumeration to fail
    pub fail_enumeration: Mutex<bool>,

    /// Configure enumeration to fail with an auth error
    pub fail_auth: Mutex<bool>,

    /// Configure power requests to fail
    pub fail_requests: Mutex<bool>,
}

impl MemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a machine in the given initial state.
    pub fn insert(&self, machine: Machine, state: PowerState) {
        self.machines
            .lock()
            .unwrap()
            .insert(machine.id.clone(), MachineRecord { machine, state });
    }

    /// Overwrite a machine's observed state.
    pub fn set_state(&self, id: &MachineId, state: PowerState) {
        if let Some(record) = self.machines.lock().unwrap().get_mut(id) {
            record.state = state;
        }
    }

    /// Current state of a machine, if it exists.
    pub fn state_of(&self, id: &MachineId) -> Option<PowerState> {
        self.machines.lock().unwrap().get(id).map(|r| r.state)
    }

    /// Mark a machine as stuck: commands are accepted but its state never
    /// changes, so verification re-polls never converge.
    pub fn set_stuck(&self, id: &MachineId) {
        self.stuck.lock().unwrap().insert(id.clone());
    }

    /// Every command received so far, in order.
    pub fn commands(&self) -> Vec<(MachineId, PowerCommand)> {
        self.commands.lock().unwrap().clone()
    }

    pub fn machine_count(&self) -> usize {
        self.machines.lock().unwrap().len()
    }
}

#[async_trait]
impl CloudProvider for MemoryCloud {
    async fn list_machines(&self) -> CloudResult<Vec<Machine>> {
        if *self.fail_auth.lock().unwrap() {
            return Err(CloudError::Auth("simulated auth failure".into()));
        }
        if *self.fail_enumeration.lock().unwrap() {
            return Err(CloudError::Enumeration("simulated enumeration failure".into()));
        }

        Ok(self
            .machines
            .lock()
            .unwrap()
            .values()
            .map(|r| r.machine.clone())
            .collect())
    }

    async fn power_state(&self, id: &MachineId) -> CloudResult<PowerState> {
        self.machines
            .lock()
            .unwrap()
            .get(id)
            .map(|r| r.state)
            .ok_or_else(|| CloudError::MachineNotFound(id.clone()))
    }

    async fn request_power(&self, id: &MachineId, command: PowerCommand) -> CloudResult<()> {
        if *self.fail_requests.lock().unwrap() {
            return Err(CloudError::Request("simulated request failure".into()));
        }

        let mut machines = self.machines.lock().unwrap();
        let record = machines
            .get_mut(id)
            .ok_or_else(|| CloudError::MachineNotFound(id.clone()))?;

        self.commands.lock().unwrap().push((id.clone(), command));

        // Stuck machines accept the command without ever converging
        if !self.stuck.lock().unwrap().contains(id) {
            record.state = command.target();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_change_state() {
        let cloud = MemoryCloud::new();
        let id = MachineId::new("vm-1");
        cloud.insert(Machine::new("vm-1", "prod"), PowerState::Stopped);

        cloud.request_power(&id, PowerCommand::Start).await.unwrap();

        assert_eq!(cloud.power_state(&id).await.unwrap(), PowerState::Running);
        assert_eq!(cloud.commands(), vec![(id, PowerCommand::Start)]);
    }

    #[tokio::test]
    async fn stuck_machine_accepts_but_never_converges() {
        let cloud = MemoryCloud::new();
        let id = MachineId::new("vm-1");
        cloud.insert(Machine::new("vm-1", "prod"), PowerState::Running);
        cloud.set_stuck(&id);

        cloud.request_power(&id, PowerCommand::Stop).await.unwrap();

        assert_eq!(cloud.power_state(&id).await.unwrap(), PowerState::Running);
        assert_eq!(cloud.commands().len(), 1);
    }

    #[tokio::test]
    async fn enumeration_failure_knob() {
        let cloud = MemoryCloud::new();
        *cloud.fail_enumeration.lock().unwrap() = true;

        assert!(matches!(
            cloud.list_machines().await,
            Err(CloudError::Enumeration(_))
        ));
    }

    #[tokio::test]
    async fn auth_failure_takes_precedence() {
        let cloud = MemoryCloud::new();
        *cloud.fail_auth.lock().unwrap() = true;

        assert!(matches!(cloud.list_machines().await, Err(CloudError::Auth(_))));
    }

    #[tokio::test]
    async fn unknown_machine_is_not_found() {
        let cloud = MemoryCloud::new();
        let id = MachineId::new("ghost");

        assert!(matches!(
            cloud.power_state(&id).await,
            Err(CloudError::MachineNotFound(_))
        ));
    }

    #[tokio::test]
    async fn enumeration_order_is_stable() {
        let cloud = MemoryCloud::new();
        cloud.insert(Machine::new("vm-b", "prod"), PowerState::Stopped);
        cloud.insert(Machine::new("vm-a", "prod"), PowerState::Stopped);

        let first: Vec<MachineId> = cloud
            .list_machines()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        let second: Vec<MachineId> = cloud
            .list_machines()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(first, second);
        assert_eq!(first[0], MachineId::new("vm-a"));
    }
}
