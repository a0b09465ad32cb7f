//! The reconciliation pass

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use warden_cloud::{CloudProvider, Machine, PowerCommand, PowerState};
use warden_config::{Config, TagConfig};
use warden_schedule::{resolve_schedules, DesiredState};
use warden_util::{PassId, Result};

use crate::{MachineOutcome, MachineReport, PassReport};

/// Drives one reconciliation pass at a time over a fleet.
///
/// Holds no per-machine state: every pass recomputes every decision from the
/// machine's tags and the pass instant.
pub struct Reconciler {
    cloud: Arc<dyn CloudProvider>,
    tags: TagConfig,
    verify_wait: Duration,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(cloud: Arc<dyn CloudProvider>, config: &Config) -> Self {
        Self {
            cloud,
            tags: config.tags.clone(),
            verify_wait: config.daemon.verify_wait,
            dry_run: config.daemon.dry_run,
        }
    }

    /// Override the dry-run setting (CLI flag wins over config).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one pass over the whole fleet at the given instant.
    ///
    /// `now` is captured once by the caller so every machine in the pass is
    /// judged against the same instant. Only enumeration and auth failures
    /// abort the pass; everything else degrades to a per-machine outcome.
    pub async fn run_pass(&self, now: DateTime<Local>) -> Result<PassReport> {
        let pass_id = PassId::new();
        let machines = self.cloud.list_machines().await?;

        info!(
            pass_id = %pass_id,
            machine_count = machines.len(),
            evaluated_at = %warden_util::format_instant(&now),
            dry_run = self.dry_run,
            "Pass started"
        );

        let mut reports = Vec::with_capacity(machines.len());
        for machine in &machines {
            let report = self.reconcile_machine(machine, &now).await;

            for warning in &report.warnings {
                warn!(
                    pass_id = %pass_id,
                    machine = %report.machine,
                    tag = %warning.tag,
                    entry = %warning.entry,
                    reason = %warning.reason,
                    "Invalid schedule entry"
                );
            }
            info!(
                pass_id = %pass_id,
                machine = %report.machine,
                resource_group = %report.resource_group,
                outcome = %report.outcome,
                "Machine reconciled"
            );

            reports.push(report);
        }

        let report = PassReport {
            pass_id,
            evaluated_at: now,
            dry_run: self.dry_run,
            machines: reports,
        };

        info!(
            pass_id = %pass_id,
            actions = report.actions_taken(),
            failures = report.failures(),
            warnings = report.warnings(),
            "Pass finished"
        );

        Ok(report)
    }

    async fn reconcile_machine(&self, machine: &Machine, now: &DateTime<Local>) -> MachineReport {
        let resolution = resolve_schedules(
            machine.tag(&self.tags.deny_start),
            machine.tag(&self.tags.allow_start),
            now,
        );
        let matched_entry = resolution.matched_entry().map(str::to_string);

        let mut report = MachineReport {
            machine: machine.id.clone(),
            resource_group: machine.resource_group.clone(),
            desired: resolution.desired,
            observed: None,
            outcome: MachineOutcome::Untouched,
            matched_entry,
            warnings: resolution.warnings,
        };

        let Some(desired) = resolution.desired else {
            debug!(machine = %machine.id, "No applicable schedule");
            return report;
        };

        let observed = match self.cloud.power_state(&machine.id).await {
            Ok(state) => state,
            Err(e) => {
                report.outcome = MachineOutcome::Skipped {
                    reason: format!("state query failed: {e}"),
                };
                return report;
            }
        };
        report.observed = Some(observed);

        if !observed.is_settled() {
            report.outcome = MachineOutcome::Skipped {
                reason: format!("machine is {observed}"),
            };
            return report;
        }

        if state_matches(observed, desired) {
            report.outcome = MachineOutcome::Converged;
            return report;
        }

        let command = match desired {
            DesiredState::Running => PowerCommand::Start,
            DesiredState::Stopped => PowerCommand::Stop,
        };

        if self.dry_run {
            report.outcome = match command {
                PowerCommand::Start => MachineOutcome::WouldStart,
                PowerCommand::Stop => MachineOutcome::WouldStop,
            };
            return report;
        }

        if let Err(e) = self.cloud.request_power(&machine.id, command).await {
            report.outcome = MachineOutcome::Failed {
                detail: format!("{command} request failed: {e}"),
            };
            return report;
        }

        // One bounded wait, one re-check. Failure to converge is reported,
        // not retried; the next pass gets another chance.
        if !self.verify_wait.is_zero() {
            tokio::time::sleep(self.verify_wait).await;
        }

        report.outcome = match self.cloud.power_state(&machine.id).await {
            Ok(state) if state == command.target() => match command {
                PowerCommand::Start => MachineOutcome::Started,
                PowerCommand::Stop => MachineOutcome::Stopped,
            },
            Ok(state) => MachineOutcome::Failed {
                detail: format!(
                    "still {state} after {}s verification wait",
                    self.verify_wait.as_secs()
                ),
            },
            Err(e) => MachineOutcome::Failed {
                detail: format!("verification poll failed: {e}"),
            },
        };

        report
    }
}

fn state_matches(observed: PowerState, desired: DesiredState) -> bool {
    matches!(
        (observed, desired),
        (PowerState::Running, DesiredState::Running) | (PowerState::Stopped, DesiredState::Stopped)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use warden_cloud::MemoryCloud;
    use warden_util::{MachineId, WardenError};

    // 2026-08-24 is a Monday.
    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 24, h, m, 0).unwrap()
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        // No real waiting in tests; MemoryCloud converges instantly.
        config.daemon.verify_wait = Duration::ZERO;
        config
    }

    fn reconciler(cloud: Arc<MemoryCloud>) -> Reconciler {
        Reconciler::new(cloud, &test_config())
    }

    #[tokio::test]
    async fn starts_machine_inside_allow_window() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Stopped,
        );

        let report = reconciler(cloud.clone()).run_pass(at(10, 0)).await.unwrap();

        assert_eq!(report.machines[0].outcome, MachineOutcome::Started);
        assert_eq!(
            cloud.state_of(&MachineId::new("vm-1")),
            Some(PowerState::Running)
        );
    }

    #[tokio::test]
    async fn stops_machine_outside_allow_window() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Running,
        );

        let report = reconciler(cloud.clone()).run_pass(at(22, 0)).await.unwrap();

        assert_eq!(report.machines[0].outcome, MachineOutcome::Stopped);
        assert_eq!(
            cloud.state_of(&MachineId::new("vm-1")),
            Some(PowerState::Stopped)
        );
    }

    #[tokio::test]
    async fn converged_machine_gets_no_command() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Running,
        );

        let report = reconciler(cloud.clone()).run_pass(at(10, 0)).await.unwrap();

        assert_eq!(report.machines[0].outcome, MachineOutcome::Converged);
        assert!(cloud.commands().is_empty());
    }

    #[tokio::test]
    async fn untagged_machine_is_untouched() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(Machine::new("vm-1", "prod"), PowerState::Running);

        let report = reconciler(cloud.clone()).run_pass(at(10, 0)).await.unwrap();

        assert_eq!(report.machines[0].outcome, MachineOutcome::Untouched);
        assert_eq!(report.machines[0].observed, None);
        assert!(cloud.commands().is_empty());
    }

    #[tokio::test]
    async fn transitioning_machine_is_skipped() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Transitioning,
        );

        let report = reconciler(cloud.clone()).run_pass(at(10, 0)).await.unwrap();

        assert!(matches!(
            report.machines[0].outcome,
            MachineOutcome::Skipped { .. }
        ));
        assert!(cloud.commands().is_empty());
    }

    #[tokio::test]
    async fn dry_run_decides_without_acting() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Stopped,
        );

        let report = reconciler(cloud.clone())
            .with_dry_run(true)
            .run_pass(at(10, 0))
            .await
            .unwrap();

        assert_eq!(report.machines[0].outcome, MachineOutcome::WouldStart);
        assert!(report.dry_run);
        assert!(cloud.commands().is_empty());
        assert_eq!(
            cloud.state_of(&MachineId::new("vm-1")),
            Some(PowerState::Stopped)
        );
    }

    #[tokio::test]
    async fn stuck_machine_fails_without_blocking_siblings() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-a", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Running,
        );
        cloud.insert(
            Machine::new("vm-b", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Stopped,
        );
        cloud.set_stuck(&MachineId::new("vm-a"));

        // Outside the window: vm-a should stop but is stuck; vm-b converges.
        let report = reconciler(cloud.clone()).run_pass(at(22, 0)).await.unwrap();

        let vm_a = report
            .machines
            .iter()
            .find(|m| m.machine.as_str() == "vm-a")
            .unwrap();
        let vm_b = report
            .machines
            .iter()
            .find(|m| m.machine.as_str() == "vm-b")
            .unwrap();

        assert!(vm_a.outcome.is_failure());
        assert_eq!(vm_b.outcome, MachineOutcome::Converged);
        assert_eq!(report.failures(), 1);
    }

    #[tokio::test]
    async fn deny_schedule_overrides_allow() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod")
                .with_tag("NoStartSchedule", "Monday")
                .with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Running,
        );

        let report = reconciler(cloud.clone()).run_pass(at(10, 0)).await.unwrap();

        assert_eq!(report.machines[0].desired, Some(DesiredState::Stopped));
        assert_eq!(report.machines[0].outcome, MachineOutcome::Stopped);
    }

    #[tokio::test]
    async fn custom_tag_names_from_config() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("UptimeSchedule", "8->19"),
            PowerState::Stopped,
        );

        let mut config = test_config();
        config.tags.allow_start = "UptimeSchedule".to_string();

        let report = Reconciler::new(cloud.clone(), &config)
            .run_pass(at(10, 0))
            .await
            .unwrap();

        assert_eq!(report.machines[0].outcome, MachineOutcome::Started);
    }

    #[tokio::test]
    async fn invalid_entry_warns_but_machine_still_reconciles() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "not-a-date,8->19"),
            PowerState::Stopped,
        );

        let report = reconciler(cloud.clone()).run_pass(at(10, 0)).await.unwrap();

        assert_eq!(report.machines[0].outcome, MachineOutcome::Started);
        assert_eq!(report.machines[0].warnings.len(), 1);
        assert_eq!(report.warnings(), 1);
    }

    #[tokio::test]
    async fn enumeration_failure_aborts_pass() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Stopped,
        );
        *cloud.fail_enumeration.lock().unwrap() = true;

        let result = reconciler(cloud.clone()).run_pass(at(10, 0)).await;

        assert!(matches!(result, Err(WardenError::Enumeration(_))));
        assert!(cloud.commands().is_empty());
    }

    #[tokio::test]
    async fn request_failure_degrades_to_machine_outcome() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Stopped,
        );
        *cloud.fail_requests.lock().unwrap() = true;

        let report = reconciler(cloud.clone()).run_pass(at(10, 0)).await.unwrap();

        assert!(report.machines[0].outcome.is_failure());
    }

    #[tokio::test]
    async fn identical_passes_are_idempotent() {
        let cloud = Arc::new(MemoryCloud::new());
        cloud.insert(
            Machine::new("vm-1", "prod").with_tag("AutoShutdownSchedule", "8->19"),
            PowerState::Stopped,
        );

        let reconciler = reconciler(cloud.clone());

        let first = reconciler.run_pass(at(10, 0)).await.unwrap();
        assert_eq!(first.machines[0].outcome, MachineOutcome::Started);

        // Second pass at the same instant: already converged, no new command.
        let second = reconciler.run_pass(at(10, 0)).await.unwrap();
        assert_eq!(second.machines[0].outcome, MachineOutcome::Converged);
        assert_eq!(cloud.commands().len(), 1);
    }
}
