//! Multi-suite phased execution.
//!
//! - [`TestSuite`] - capability surface every pluggable suite implements
//! - [`ExecutionPlan`] / [`PlanEntry`] - ordered suites with run and clean flags
//! - [`TestSetTable`] - declarative `test set -> (suite -> enabled)` table
//! - [`PhaseScheduler`] - provisions, runs send/verify rounds, or cleans up

mod plan;
mod scheduler;
mod suite;

pub use plan::{ExecutionPlan, PlanEntry, TestSetTable};
pub use scheduler::{CleanFailure, ExecutionOutcome, PhaseScheduler, SchedulePolicy};
pub use suite::TestSuite;
