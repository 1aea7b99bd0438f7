//! Suites implemented as external commands.
//!
//! The verify command reports its outcome through the exit status:
//!
//! | status | meaning |
//! |--------|---------|
//! | 0 | passed |
//! | 75 | retryable |
//! | 76 | reset and retry |
//! | 77 | downstream table does not exist yet |
//! | other | non retryable |

use async_trait::async_trait;
use e2e_core::{NameSalt, RunPhase, TestSet};
use orchestrator::{QueryError, SuiteError, TestSuite};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::manifest::SuiteSpec;

pub const EXIT_RETRYABLE: i32 = 75;
pub const EXIT_RESET: i32 = 76;
pub const EXIT_NOT_READY: i32 = 77;

const RELATION_MISSING: &str = "does not exist or not authorized";
const STDERR_TAIL_LINES: usize = 20;

/// Run-wide values every suite command receives.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub salt: NameSalt,
    pub test_version: String,
    pub test_set: TestSet,
    /// JSON-encoded queue client configuration.
    pub client_config: String,
    pub schema_registry: String,
    pub connect_address: String,
    pub working_dir: Option<PathBuf>,
}

pub struct CommandSuite {
    spec: SuiteSpec,
    context: CommandContext,
}

impl CommandSuite {
    pub fn new(spec: SuiteSpec, context: CommandContext) -> Self {
        Self { spec, context }
    }

    fn command(&self, argv: &[String], round: Option<u32>) -> Result<Command, SuiteError> {
        let round_arg = round.map(|r| r.to_string()).unwrap_or_default();
        let mut args = argv
            .iter()
            .map(|arg| arg.replace("{round}", &round_arg).replace("{salt}", self.context.salt.as_str()));
        let program = args
            .next()
            .ok_or_else(|| SuiteError::non_retryable(format!("{} has an empty command", self.spec.name)))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env("E2E_NAME_SALT", self.context.salt.as_str())
            .env("E2E_TEST_VERSION", &self.context.test_version)
            .env("E2E_TEST_SET", self.context.test_set.as_str())
            .env("E2E_CLIENT_CONFIG", &self.context.client_config)
            .env("E2E_SCHEMA_REGISTRY", &self.context.schema_registry)
            .env("E2E_CONNECT_ADDRESS", &self.context.connect_address)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(r) = round {
            cmd.env("E2E_ROUND", r.to_string());
        }
        if let Some(ref dir) = self.context.working_dir {
            cmd.current_dir(dir);
        }
        Ok(cmd)
    }

    async fn run(&self, phase: RunPhase, argv: &[String], round: Option<u32>) -> Result<(), SuiteError> {
        let mut cmd = self.command(argv, round)?;
        let output = cmd.output().await.map_err(|e| {
            SuiteError::Unexpected(
                anyhow::Error::new(e).context(format!("failed to spawn {} command for {}", phase, self.spec.name)),
            )
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(suite = %self.spec.name, phase = %phase, output = %stdout.trim_end(), "Command output");
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        match phase {
            RunPhase::Verify => classify_exit(output.status.code(), &stderr),
            _ if output.status.success() => Ok(()),
            _ => Err(SuiteError::non_retryable(failure_reason(output.status.code(), &stderr))),
        }
    }
}

/// Map a verify command's exit status and stderr onto a suite error.
pub fn classify_exit(code: Option<i32>, stderr: &str) -> Result<(), SuiteError> {
    let reason = failure_reason(code, stderr);
    match code {
        Some(0) => Ok(()),
        Some(EXIT_RETRYABLE) => Err(SuiteError::retryable(reason)),
        Some(EXIT_RESET) => Err(SuiteError::reset(reason)),
        Some(EXIT_NOT_READY) => Err(QueryError::relation_not_found(reason).into()),
        _ if stderr.contains(RELATION_MISSING) => Err(QueryError::relation_not_found(reason).into()),
        _ => Err(SuiteError::non_retryable(reason)),
    }
}

fn failure_reason(code: Option<i32>, stderr: &str) -> String {
    let lines: Vec<&str> = stderr.trim().lines().collect();
    let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
    if !tail.is_empty() {
        return tail;
    }
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "terminated by signal".to_string(),
    }
}

#[async_trait]
impl TestSuite for CommandSuite {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn config_file_name(&self) -> &str {
        &self.spec.config_file
    }

    async fn send(&self) -> Result<(), SuiteError> {
        self.run(RunPhase::Send, &self.spec.send, None).await
    }

    async fn verify(&self, round: u32) -> Result<(), SuiteError> {
        self.run(RunPhase::Verify, &self.spec.verify, Some(round)).await
    }

    async fn clean(&self) -> Result<(), SuiteError> {
        self.run(RunPhase::Clean, &self.spec.clean, None).await
    }
}
