//! Phase scheduler for one orchestration pass.
//!
//! Run mode provisions a connector per enabled suite, waits for them to
//! settle, then drives `send -> settle -> verify` rounds. Every verify goes
//! through the [`RetryDriver`]. Cleanup mode only tears suites down.
//!
//! Everything runs sequentially on the caller's task; the only suspension
//! points are the settle waits and the retry driver's inter-attempt wait.

use e2e_core::{NameSalt, TestSet};
use events::{Event, EventBus, PassMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::plan::ExecutionPlan;
use super::suite::TestSuite;
use crate::collaborators::ConnectorLifecycle;
use crate::error::{OrchestratorError, Result};
use crate::retry::{RetryDriver, RetryPolicy};

pub const DEFAULT_PROVISION_SETTLE: Duration = Duration::from_secs(10);
pub const DEFAULT_VERIFY_SETTLE: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Pause after provisioning so connectors can start.
    pub provision_settle: Duration,
    /// Pause between the send and verify phases of a round.
    pub verify_settle: Duration,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            provision_settle: DEFAULT_PROVISION_SETTLE,
            verify_settle: DEFAULT_VERIFY_SETTLE,
        }
    }
}

impl SchedulePolicy {
    pub fn with_provision_settle(mut self, settle: Duration) -> Self {
        self.provision_settle = settle;
        self
    }

    pub fn with_verify_settle(mut self, settle: Duration) -> Self {
        self.verify_settle = settle;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanFailure {
    pub suite: String,
    pub error: String,
}

/// Result of a pass that was not aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every enabled suite passed every round.
    Passed {
        suites: Vec<String>,
        rounds: u32,
        verify_calls: u32,
    },
    /// Cleanup ran over every clean-enabled suite; failures were isolated.
    Cleaned {
        cleaned: Vec<String>,
        failures: Vec<CleanFailure>,
    },
}

pub struct PhaseScheduler {
    lifecycle: Arc<dyn ConnectorLifecycle>,
    salt: NameSalt,
    policy: SchedulePolicy,
    retry: RetryDriver,
    event_bus: Option<EventBus>,
}

impl PhaseScheduler {
    pub fn new(lifecycle: Arc<dyn ConnectorLifecycle>, salt: NameSalt) -> Self {
        Self {
            lifecycle,
            salt,
            policy: SchedulePolicy::default(),
            retry: RetryDriver::default(),
            event_bus: None,
        }
    }

    pub fn with_policy(mut self, policy: SchedulePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryDriver::new(policy);
        self
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    fn emit(&self, event: Event) {
        if let Some(ref bus) = self.event_bus {
            bus.emit(event);
        }
    }

    /// Run one pass of `plan`. The clean test set selects cleanup mode.
    pub async fn execute(&self, test_set: TestSet, plan: &ExecutionPlan) -> Result<ExecutionOutcome> {
        if test_set.is_clean() {
            Ok(self.clean(plan).await)
        } else {
            self.run(plan).await
        }
    }

    /// Tear down every clean-enabled suite. A failing suite is logged and
    /// the rest still run.
    pub async fn clean(&self, plan: &ExecutionPlan) -> ExecutionOutcome {
        let pass_id = Uuid::new_v4();
        let suites: Vec<&Arc<dyn TestSuite>> = plan.cleanable().collect();

        info!(label = %plan.label(), suites = suites.len(), "Starting cleanup pass");
        self.emit(Event::PassStarted {
            pass_id,
            label: plan.label().to_string(),
            mode: PassMode::Cleanup,
            suites: suites.len(),
            rounds: 0,
        });

        let mut cleaned = Vec::new();
        let mut failures = Vec::new();

        for suite in suites {
            let name = suite.name().to_string();
            match suite.clean().await {
                Ok(()) => {
                    info!(suite = %name, "Cleaned");
                    self.emit(Event::SuiteCleaned {
                        pass_id,
                        suite: name.clone(),
                    });
                    cleaned.push(name);
                }
                Err(e) => {
                    warn!(suite = %name, error = %e, "Clean failed, continuing");
                    self.emit(Event::CleanFailed {
                        pass_id,
                        suite: name.clone(),
                        error: e.to_string(),
                    });
                    failures.push(CleanFailure {
                        suite: name,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(cleaned = cleaned.len(), failed = failures.len(), "All clean done");
        self.emit(Event::PassFinished {
            pass_id,
            success: failures.is_empty(),
        });

        ExecutionOutcome::Cleaned { cleaned, failures }
    }

    /// Provision, then run every round. The first terminal failure aborts
    /// the remaining suites and rounds.
    pub async fn run(&self, plan: &ExecutionPlan) -> Result<ExecutionOutcome> {
        let pass_id = Uuid::new_v4();
        let suites: Vec<&Arc<dyn TestSuite>> = plan.runnable().collect();

        info!(
            label = %plan.label(),
            suites = suites.len(),
            rounds = plan.rounds(),
            "Starting pass"
        );
        self.emit(Event::PassStarted {
            pass_id,
            label: plan.label().to_string(),
            mode: PassMode::Run,
            suites: suites.len(),
            rounds: plan.rounds(),
        });

        let result = if suites.is_empty() {
            info!(label = %plan.label(), "No suites enabled, nothing to run");
            Ok(ExecutionOutcome::Passed {
                suites: Vec::new(),
                rounds: 0,
                verify_calls: 0,
            })
        } else {
            self.run_rounds(pass_id, plan.rounds(), &suites).await
        };

        match &result {
            Ok(_) => info!(label = %plan.label(), "All test passed"),
            Err(e) => error!(
                label = %plan.label(),
                suite = e.suite().unwrap_or("-"),
                round = ?e.round(),
                error = %e,
                "Pass aborted"
            ),
        }
        self.emit(Event::PassFinished {
            pass_id,
            success: result.is_ok(),
        });

        result
    }

    async fn run_rounds(
        &self,
        pass_id: Uuid,
        rounds: u32,
        suites: &[&Arc<dyn TestSuite>],
    ) -> Result<ExecutionOutcome> {
        for suite in suites {
            let config_file = suite.config_file_name();
            self.lifecycle
                .create(config_file, &self.salt)
                .await
                .map_err(|e| {
                    self.aborted(
                        pass_id,
                        OrchestratorError::provision_failed(suite.name(), config_file, format!("{:#}", e)),
                    )
                })?;
            self.emit(Event::ConnectorProvisioned {
                pass_id,
                suite: suite.name().to_string(),
                config_file: config_file.to_string(),
            });
        }

        info!(
            wait_secs = self.policy.provision_settle.as_secs(),
            "Waiting for connectors to start"
        );
        tokio::time::sleep(self.policy.provision_settle).await;

        let mut verify_calls = 0;

        for round in 0..rounds {
            info!(round, "Round started");
            self.emit(Event::RoundStarted { pass_id, round });

            for suite in suites {
                info!(suite = %suite.name(), round, "Sending data");
                suite.send().await.map_err(|e| {
                    self.aborted(
                        pass_id,
                        OrchestratorError::send_failed(suite.name(), round, e.to_string()),
                    )
                })?;
                info!(suite = %suite.name(), round, "Done sending");
                self.emit(Event::SuiteSent {
                    pass_id,
                    suite: suite.name().to_string(),
                    round,
                });
            }

            info!(
                wait_secs = self.policy.verify_settle.as_secs(),
                "Sleeping before verifying results downstream"
            );
            tokio::time::sleep(self.policy.verify_settle).await;

            for suite in suites {
                let name = suite.name();
                let target: &dyn TestSuite = suite.as_ref();
                info!(suite = %name, round, "Verifying");

                let stats = self
                    .retry
                    .verify_with_retry_observed(
                        move |r| target.verify(r),
                        round,
                        |failed| {
                            self.emit(Event::VerifyAttemptFailed {
                                pass_id,
                                suite: name.to_string(),
                                round: failed.round,
                                attempt: failed.attempt,
                                disposition: failed.disposition.as_str().to_string(),
                                reason: failed.disposition.reason().to_string(),
                            })
                        },
                    )
                    .await
                    .map_err(|e| self.aborted(pass_id, OrchestratorError::verify_failed(name, round, e)))?;

                verify_calls += stats.calls;
                info!(suite = %name, round, calls = stats.calls, resets = stats.resets, "Passed");
                self.emit(Event::SuiteVerified {
                    pass_id,
                    suite: name.to_string(),
                    round,
                    calls: stats.calls,
                });
            }
        }

        Ok(ExecutionOutcome::Passed {
            suites: suites.iter().map(|s| s.name().to_string()).collect(),
            rounds,
            verify_calls,
        })
    }

    fn aborted(&self, pass_id: Uuid, err: OrchestratorError) -> OrchestratorError {
        self.emit(Event::SuiteFailed {
            pass_id,
            suite: err.suite().unwrap_or_default().to_string(),
            round: err.round(),
            reason: err.to_string(),
        });
        err
    }
}
