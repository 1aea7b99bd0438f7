//! End-to-end behaviour of the scheduler and retry driver against
//! recording fake suites.

use async_trait::async_trait;
use e2e_core::{NameSalt, TestSet};
use orchestrator::{
    ConnectorLifecycle, ExecutionOutcome, ExecutionPlan, OrchestratorError, PhaseScheduler,
    RetryDriver, RetryError, RetryPolicy, SuiteError, TestSetTable, TestSuite,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type CallLog = Arc<Mutex<Vec<String>>>;

/// Logs every call as `name:op[:round]`. Verify outcomes are scripted;
/// once the script is exhausted verify succeeds.
struct RecordingSuite {
    name: String,
    log: CallLog,
    verify_script: Mutex<VecDeque<Result<(), SuiteError>>>,
    fail_clean: bool,
    fail_send: bool,
    sent: Mutex<u32>,
}

impl RecordingSuite {
    fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            verify_script: Mutex::new(VecDeque::new()),
            fail_clean: false,
            fail_send: false,
            sent: Mutex::new(0),
        }
    }

    fn verifying(self, script: Vec<Result<(), SuiteError>>) -> Self {
        *self.verify_script.lock().unwrap() = script.into();
        self
    }

    fn failing_clean(mut self) -> Self {
        self.fail_clean = true;
        self
    }

    fn failing_send(mut self) -> Self {
        self.fail_send = true;
        self
    }

    fn arc(self) -> Arc<dyn TestSuite> {
        Arc::new(self)
    }
}

#[async_trait]
impl TestSuite for RecordingSuite {
    fn name(&self) -> &str {
        &self.name
    }

    fn config_file_name(&self) -> &str {
        "recording.json"
    }

    async fn send(&self) -> Result<(), SuiteError> {
        self.log.lock().unwrap().push(format!("{}:send", self.name));
        if self.fail_send {
            return Err(SuiteError::non_retryable("broker unreachable"));
        }
        *self.sent.lock().unwrap() += 1;
        Ok(())
    }

    async fn verify(&self, round: u32) -> Result<(), SuiteError> {
        self.log.lock().unwrap().push(format!("{}:verify:{}", self.name, round));
        if *self.sent.lock().unwrap() == 0 {
            return Err(SuiteError::retryable("nothing sent yet"));
        }
        self.verify_script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn clean(&self) -> Result<(), SuiteError> {
        self.log.lock().unwrap().push(format!("{}:clean", self.name));
        if self.fail_clean {
            return Err(SuiteError::non_retryable("permission denied"));
        }
        Ok(())
    }
}

#[derive(Default)]
struct NoopLifecycle {
    created: Mutex<Vec<String>>,
}

#[async_trait]
impl ConnectorLifecycle for NoopLifecycle {
    async fn create(&self, config_file: &str, salt: &NameSalt) -> anyhow::Result<String> {
        self.created.lock().unwrap().push(config_file.to_string());
        Ok(e2e_core::connector_name(config_file, salt))
    }
    async fn restart(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn pause(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn resume(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }
    async fn delete(&self, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

fn scheduler() -> PhaseScheduler {
    PhaseScheduler::new(Arc::new(NoopLifecycle::default()), NameSalt::new("_it"))
        .with_retry_policy(RetryPolicy::default().with_max_attempts(3).with_wait(Duration::from_secs(5)))
}

fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn verify_before_send_retries_then_fails_closed() {
    let log = CallLog::default();
    let suite = RecordingSuite::new("A", &log);
    let driver = RetryDriver::new(RetryPolicy::default().with_max_attempts(4));

    let err = driver
        .verify_with_retry(|round| suite.verify(round), 0)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RetryError::MaxRetryExceeded {
            attempts: 4,
            last_reason: "nothing sent yet".to_string()
        }
    );
    assert_eq!(calls(&log).len(), 4);
}

#[tokio::test(start_paused = true)]
async fn reset_twice_then_success_never_reaches_bound() {
    let log = CallLog::default();
    let suite = RecordingSuite::new("A", &log).verifying(vec![
        Err(SuiteError::retryable("lagging")),
        Err(SuiteError::reset("offset rewound")),
        Err(SuiteError::retryable("lagging")),
        Err(SuiteError::reset("offset rewound")),
    ]);
    suite.send().await.unwrap();
    let driver = RetryDriver::new(RetryPolicy::default().with_max_attempts(2));

    let stats = driver
        .verify_with_retry(|round| suite.verify(round), 0)
        .await
        .unwrap();

    assert_eq!(stats.calls, 5);
    assert_eq!(stats.resets, 2);
    assert_eq!(stats.attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn three_rounds_send_three_times_and_verify_in_order() {
    let log = CallLog::default();
    let plan = ExecutionPlan::new("Stress")
        .with_rounds(3)
        .with_entry(RecordingSuite::new("A", &log).arc(), true, true);

    let outcome = scheduler().execute(TestSet::Confluent, &plan).await.unwrap();

    assert_eq!(
        calls(&log),
        vec!["A:send", "A:verify:0", "A:send", "A:verify:1", "A:send", "A:verify:2"]
    );
    assert!(matches!(outcome, ExecutionOutcome::Passed { rounds: 3, verify_calls: 3, .. }));
}

#[tokio::test(start_paused = true)]
async fn sends_and_verifies_follow_plan_order() {
    let log = CallLog::default();
    let plan = ExecutionPlan::new("Round 1")
        .with_entry(RecordingSuite::new("A", &log).arc(), true, true)
        .with_entry(RecordingSuite::new("Skipped", &log).arc(), false, true)
        .with_entry(RecordingSuite::new("B", &log).arc(), true, true);

    scheduler().execute(TestSet::Apache, &plan).await.unwrap();

    assert_eq!(calls(&log), vec!["A:send", "B:send", "A:verify:0", "B:verify:0"]);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_verify_aborts_before_next_suite() {
    let log = CallLog::default();
    let plan = ExecutionPlan::new("Round 1")
        .with_rounds(2)
        .with_entry(
            RecordingSuite::new("A", &log)
                .verifying(vec![Err(SuiteError::non_retryable("content mismatch"))])
                .arc(),
            true,
            true,
        )
        .with_entry(RecordingSuite::new("B", &log).arc(), true, true);

    let err = scheduler().execute(TestSet::Confluent, &plan).await.unwrap_err();

    assert_eq!(calls(&log), vec!["A:send", "B:send", "A:verify:0"]);
    match err {
        OrchestratorError::VerifyFailed { suite, round, source } => {
            assert_eq!(suite, "A");
            assert_eq!(round, 0);
            assert!(matches!(source, RetryError::NonRetryable { ref reason, .. } if reason == "content mismatch"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn send_failure_aborts_remaining_sends_and_verifies() {
    let log = CallLog::default();
    let plan = ExecutionPlan::new("Round 1")
        .with_rounds(2)
        .with_entry(RecordingSuite::new("A", &log).arc(), true, true)
        .with_entry(RecordingSuite::new("B", &log).failing_send().arc(), true, true)
        .with_entry(RecordingSuite::new("C", &log).arc(), true, true);

    let err = scheduler().execute(TestSet::Confluent, &plan).await.unwrap_err();

    assert_eq!(calls(&log), vec!["A:send", "B:send"]);
    assert_eq!(err.suite(), Some("B"));
    assert_eq!(err.round(), Some(0));
    match err {
        OrchestratorError::SendFailed { reason, .. } => assert!(reason.contains("broker unreachable")),
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn unclassified_verify_failure_is_terminal() {
    let log = CallLog::default();
    let plan = ExecutionPlan::new("Round 1").with_entry(
        RecordingSuite::new("A", &log)
            .verifying(vec![Err(SuiteError::from(anyhow::anyhow!("decoder panicked")))])
            .arc(),
        true,
        true,
    );

    let err = scheduler().execute(TestSet::Confluent, &plan).await.unwrap_err();

    assert_eq!(err.suite(), Some("A"));
    assert!(err.to_string().contains("decoder panicked"));
    assert_eq!(calls(&log), vec!["A:send", "A:verify:0"]);
}

#[tokio::test]
async fn cleanup_never_sends_or_verifies_and_isolates_failures() {
    let log = CallLog::default();
    let plan = ExecutionPlan::new("Round 1")
        .with_entry(RecordingSuite::new("A", &log).failing_clean().arc(), true, true)
        .with_entry(RecordingSuite::new("NoClean", &log).arc(), true, false)
        .with_entry(RecordingSuite::new("B", &log).arc(), false, true);

    let outcome = scheduler().execute(TestSet::Clean, &plan).await.unwrap();

    assert_eq!(calls(&log), vec!["A:clean", "B:clean"]);
    match outcome {
        ExecutionOutcome::Cleaned { cleaned, failures } => {
            assert_eq!(cleaned, vec!["B".to_string()]);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].suite, "A");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn clean_twice_without_state_succeeds() {
    let log = CallLog::default();
    let suite = RecordingSuite::new("A", &log);

    assert!(suite.clean().await.is_ok());
    assert!(suite.clean().await.is_ok());

    let plan = ExecutionPlan::new("Round 1").with_entry(suite.arc(), false, true);
    let scheduler = scheduler();
    for _ in 0..2 {
        let outcome = scheduler.execute(TestSet::Clean, &plan).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Cleaned { ref failures, .. } if failures.is_empty()));
    }
}

#[tokio::test(start_paused = true)]
async fn table_driven_plan_runs_only_enabled_suites() {
    let log = CallLog::default();
    let table = TestSetTable::new()
        .with_suite("A", true, false, true)
        .with_suite("B", true, true, false);
    let suites = vec![
        RecordingSuite::new("A", &log).arc(),
        RecordingSuite::new("B", &log).arc(),
    ];

    let plan = table.build_plan("Round 1", TestSet::Apache, suites).unwrap();
    scheduler().execute(TestSet::Apache, &plan).await.unwrap();

    assert_eq!(calls(&log), vec!["B:send", "B:verify:0"]);
}
