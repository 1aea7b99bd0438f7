use anyhow::{Context, Result};
use e2e_core::TestSet;
use orchestrator::{ExecutionOutcome, PhaseScheduler, TestSuite};
use std::sync::Arc;
use tracing::{info, warn};

use crate::command_suite::{CommandContext, CommandSuite};
use crate::manifest::{GroupKind, GroupSpec, Manifest};

/// Groups for one invocation, in execution order.
///
/// Stress runs only use stress groups. Otherwise standard groups come first,
/// then delivery guarantee groups when enabled, and proxy groups last.
pub fn select_groups(manifest: &Manifest, pressure: bool, delivery_guarantee: bool) -> Vec<&GroupSpec> {
    if pressure {
        return manifest.groups_of(GroupKind::Stress).collect();
    }

    let mut groups: Vec<&GroupSpec> = manifest.groups_of(GroupKind::Standard).collect();
    if delivery_guarantee {
        groups.extend(manifest.groups_of(GroupKind::DeliveryGuarantee));
    } else if manifest.groups_of(GroupKind::DeliveryGuarantee).next().is_some() {
        info!("Not running delivery guarantee groups on this platform");
    }
    groups.extend(manifest.groups_of(GroupKind::Proxy));
    groups
}

pub struct GroupRunner<'a> {
    scheduler: &'a PhaseScheduler,
    manifest: &'a Manifest,
    context: CommandContext,
    test_set: TestSet,
}

impl<'a> GroupRunner<'a> {
    pub fn new(
        scheduler: &'a PhaseScheduler,
        manifest: &'a Manifest,
        context: CommandContext,
        test_set: TestSet,
    ) -> Self {
        Self {
            scheduler,
            manifest,
            context,
            test_set,
        }
    }

    fn suites(&self, group: &GroupSpec) -> Result<Vec<Arc<dyn TestSuite>>> {
        group
            .suites
            .iter()
            .map(|name| {
                let spec = self
                    .manifest
                    .suite(name)
                    .with_context(|| format!("group {} references unknown suite {}", group.name, name))?;
                Ok(Arc::new(CommandSuite::new(spec.clone(), self.context.clone())) as Arc<dyn TestSuite>)
            })
            .collect()
    }

    /// Run `group` as one scheduler pass.
    pub async fn run_group(&self, group: &GroupSpec) -> Result<ExecutionOutcome> {
        let plan = self
            .manifest
            .table_for(group)
            .build_plan(group.name.as_str(), self.test_set, self.suites(group)?)?
            .with_rounds(group.rounds);

        info!(group = %group.name, kind = ?group.kind, rounds = plan.rounds(), "Running group");
        let outcome = self
            .scheduler
            .execute(self.test_set, &plan)
            .await
            .with_context(|| format!("group {} failed", group.name))?;

        if let ExecutionOutcome::Cleaned { ref failures, .. } = outcome {
            for failure in failures {
                warn!(group = %group.name, suite = %failure.suite, error = %failure.error, "Suite not cleaned");
            }
        }
        Ok(outcome)
    }

    /// Run every group in order; the first failing group ends the run.
    pub async fn run_all(&self, groups: &[&GroupSpec]) -> Result<Vec<ExecutionOutcome>> {
        let mut outcomes = Vec::with_capacity(groups.len());
        for group in groups {
            outcomes.push(self.run_group(group).await?);
        }
        Ok(outcomes)
    }
}
