//! The contract a suite must satisfy to take part in orchestration.

use async_trait::async_trait;

use crate::error::SuiteError;

/// One independent end-to-end scenario.
///
/// A suite is built once per run with the shared collaborators and the run's
/// name salt. The scheduler only ever calls these methods; it never looks at
/// the concrete type except through [`TestSuite::name`] for logs and errors.
#[async_trait]
pub trait TestSuite: Send + Sync {
    /// Identity used in logs, events and failure attribution.
    fn name(&self) -> &str;

    /// Request template the connector lifecycle client provisions from.
    fn config_file_name(&self) -> &str;

    /// Produce one round of input. Called once per round, so later rounds'
    /// verification must account for everything sent so far.
    async fn send(&self) -> Result<(), SuiteError>;

    /// Check that the effects of round `round` are visible downstream.
    async fn verify(&self, round: u32) -> Result<(), SuiteError>;

    /// Tear down everything the suite may have created. Must succeed when
    /// nothing exists and when called repeatedly.
    async fn clean(&self) -> Result<(), SuiteError>;
}
