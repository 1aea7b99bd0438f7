pub mod collaborators;
pub mod engine;
pub mod error;
pub mod retry;
pub mod support;

pub use collaborators::{ConnectorLifecycle, DownstreamStore, Record, RecordProducer, Row, TopicAdmin};
pub use engine::{
    CleanFailure, ExecutionOutcome, ExecutionPlan, PhaseScheduler, PlanEntry, SchedulePolicy,
    TestSetTable, TestSuite,
};
pub use error::{OrchestratorError, QueryError, Result, SuiteError};
pub use retry::{Disposition, ErrorClassifier, RetryDriver, RetryError, RetryPolicy, RetryStats};
