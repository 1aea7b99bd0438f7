use e2e_core::TestSet;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use super::suite::TestSuite;
use crate::error::{OrchestratorError, Result};

/// A suite with its run and clean flags. The two flags are independent.
#[derive(Clone)]
pub struct PlanEntry {
    pub suite: Arc<dyn TestSuite>,
    pub run_enabled: bool,
    pub clean_enabled: bool,
}

impl fmt::Debug for PlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanEntry")
            .field("suite", &self.suite.name())
            .field("run_enabled", &self.run_enabled)
            .field("clean_enabled", &self.clean_enabled)
            .finish()
    }
}

/// Ordered suites for one scheduler pass.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    label: String,
    rounds: u32,
    entries: Vec<PlanEntry>,
}

impl ExecutionPlan {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rounds: 1,
            entries: Vec::new(),
        }
    }

    /// Number of send/verify rounds; at least one.
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds.max(1);
        self
    }

    pub fn with_entry(mut self, suite: Arc<dyn TestSuite>, run_enabled: bool, clean_enabled: bool) -> Self {
        self.push(suite, run_enabled, clean_enabled);
        self
    }

    pub fn push(&mut self, suite: Arc<dyn TestSuite>, run_enabled: bool, clean_enabled: bool) {
        self.entries.push(PlanEntry {
            suite,
            run_enabled,
            clean_enabled,
        });
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Suites to run, in plan order.
    pub fn runnable(&self) -> impl Iterator<Item = &Arc<dyn TestSuite>> {
        self.entries.iter().filter(|e| e.run_enabled).map(|e| &e.suite)
    }

    /// Suites to tear down, in plan order.
    pub fn cleanable(&self) -> impl Iterator<Item = &Arc<dyn TestSuite>> {
        self.entries.iter().filter(|e| e.clean_enabled).map(|e| &e.suite)
    }
}

/// Declarative `test set -> (suite -> enabled)` table.
///
/// The `clean` column decides which suites are torn down; the other columns
/// decide which suites run for that test set.
#[derive(Debug, Clone, Default)]
pub struct TestSetTable {
    columns: HashMap<TestSet, BTreeMap<String, bool>>,
}

impl TestSetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, test_set: TestSet, suite: impl Into<String>, enabled: bool) -> &mut Self {
        self.columns
            .entry(test_set)
            .or_default()
            .insert(suite.into(), enabled);
        self
    }

    /// Add one row: the suite's flag in every column.
    pub fn with_suite(mut self, suite: &str, confluent: bool, apache: bool, clean: bool) -> Self {
        self.set(TestSet::Confluent, suite, confluent);
        self.set(TestSet::Apache, suite, apache);
        self.set(TestSet::Clean, suite, clean);
        self
    }

    pub fn enabled(&self, test_set: TestSet, suite: &str) -> Option<bool> {
        self.columns.get(&test_set)?.get(suite).copied()
    }

    /// Every column must list exactly `suite_names`, which must be unique.
    pub fn validate(&self, suite_names: &[&str]) -> Result<()> {
        let mut expected = BTreeSet::new();
        for name in suite_names {
            if !expected.insert(*name) {
                return Err(OrchestratorError::PlanMismatch(format!(
                    "suite {} listed more than once",
                    name
                )));
            }
        }

        for test_set in TestSet::ALL {
            let column = self.columns.get(&test_set).ok_or_else(|| {
                OrchestratorError::PlanMismatch(format!("no {} column", test_set))
            })?;

            if let Some(missing) = expected.iter().find(|name| !column.contains_key(**name)) {
                return Err(OrchestratorError::PlanMismatch(format!(
                    "{} column has no entry for suite {}",
                    test_set, missing
                )));
            }
            if let Some(extra) = column.keys().find(|name| !expected.contains(name.as_str())) {
                return Err(OrchestratorError::PlanMismatch(format!(
                    "{} column names unknown suite {}",
                    test_set, extra
                )));
            }
        }

        Ok(())
    }

    /// Validate against `suites` and build the plan for `test_set`. In the
    /// clean test set nothing runs.
    pub fn build_plan(
        &self,
        label: impl Into<String>,
        test_set: TestSet,
        suites: Vec<Arc<dyn TestSuite>>,
    ) -> Result<ExecutionPlan> {
        let names: Vec<&str> = suites.iter().map(|s| s.name()).collect();
        self.validate(&names)?;

        let mut plan = ExecutionPlan::new(label);
        for suite in &suites {
            let name = suite.name();
            let clean_enabled = self.enabled(TestSet::Clean, name).unwrap_or(false);
            let run_enabled = !test_set.is_clean() && self.enabled(test_set, name).unwrap_or(false);
            plan.push(Arc::clone(suite), run_enabled, clean_enabled);
        }
        Ok(plan)
    }
}
