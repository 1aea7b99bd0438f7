use thiserror::Error;

use crate::retry::RetryError;

/// Downstream error number for "object does not exist or not authorized".
pub const RELATION_NOT_FOUND: u32 = 2003;

/// Failure reported by the downstream query collaborator.
#[derive(Debug, Clone, Error)]
#[error("query error {}: {message}", code_label(.code))]
pub struct QueryError {
    pub code: Option<u32>,
    pub message: String,
}

fn code_label(code: &Option<u32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

impl QueryError {
    pub fn new(code: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn relation_not_found(message: impl Into<String>) -> Self {
        Self::new(Some(RELATION_NOT_FOUND), message)
    }

    pub fn is_relation_not_found(&self) -> bool {
        self.code == Some(RELATION_NOT_FOUND)
    }
}

/// What a suite raises from `send`, `verify` or `clean`.
///
/// The first three variants are the suite telling the retry driver how to
/// treat the failure; `Query` and `Unexpected` are classified on its behalf.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("reset and retry: {0}")]
    ResetAndRetry(String),

    #[error("retryable: {0}")]
    Retryable(String),

    #[error("non retryable: {0}")]
    NonRetryable(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl SuiteError {
    pub fn reset(reason: impl Into<String>) -> Self {
        Self::ResetAndRetry(reason.into())
    }

    pub fn retryable(reason: impl Into<String>) -> Self {
        Self::Retryable(reason.into())
    }

    pub fn non_retryable(reason: impl Into<String>) -> Self {
        Self::NonRetryable(reason.into())
    }
}

/// Why a scheduler pass aborted. Every variant names the suite it is
/// attributed to.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Provisioning connector {config_file} for {suite} failed: {reason}")]
    ProvisionFailed {
        suite: String,
        config_file: String,
        reason: String,
    },

    #[error("{suite} failed to send in round {round}: {reason}")]
    SendFailed {
        suite: String,
        round: u32,
        reason: String,
    },

    #[error("{suite} failed verification in round {round}: {source}")]
    VerifyFailed {
        suite: String,
        round: u32,
        #[source]
        source: RetryError,
    },

    #[error("Plan mismatch: {0}")]
    PlanMismatch(String),
}

impl OrchestratorError {
    pub fn provision_failed(
        suite: impl Into<String>,
        config_file: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProvisionFailed {
            suite: suite.into(),
            config_file: config_file.into(),
            reason: reason.into(),
        }
    }

    pub fn send_failed(suite: impl Into<String>, round: u32, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            suite: suite.into(),
            round,
            reason: reason.into(),
        }
    }

    pub fn verify_failed(suite: impl Into<String>, round: u32, source: RetryError) -> Self {
        Self::VerifyFailed {
            suite: suite.into(),
            round,
            source,
        }
    }

    pub fn suite(&self) -> Option<&str> {
        match self {
            Self::ProvisionFailed { suite, .. }
            | Self::SendFailed { suite, .. }
            | Self::VerifyFailed { suite, .. } => Some(suite),
            Self::PlanMismatch(_) => None,
        }
    }

    pub fn round(&self) -> Option<u32> {
        match self {
            Self::SendFailed { round, .. } | Self::VerifyFailed { round, .. } => Some(*round),
            Self::ProvisionFailed { .. } | Self::PlanMismatch(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
