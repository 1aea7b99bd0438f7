use crate::error::SuiteError;

/// How the retry driver treats one failed verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Benign condition: reset the attempt counter and retry without waiting.
    ResetAndRetry,
    /// Consume one attempt, wait, retry.
    Retryable(String),
    /// Stop immediately and propagate.
    NonRetryable(String),
    /// The downstream relation does not exist yet. Treated as `Retryable`.
    InfrastructureNotReady(String),
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResetAndRetry => "reset_and_retry",
            Self::Retryable(_) => "retryable",
            Self::NonRetryable(_) => "non_retryable",
            Self::InfrastructureNotReady(_) => "infrastructure_not_ready",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::ResetAndRetry => "",
            Self::Retryable(reason)
            | Self::NonRetryable(reason)
            | Self::InfrastructureNotReady(reason) => reason,
        }
    }

    /// Whether this disposition uses up one unit of the attempt budget.
    pub fn consumes_attempt(&self) -> bool {
        matches!(self, Self::Retryable(_) | Self::InfrastructureNotReady(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NonRetryable(_))
    }
}

pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Exactly one disposition per failure. Anything not recognised is
    /// terminal so an unexpected bug never loops until the budget runs out.
    pub fn classify(error: &SuiteError) -> Disposition {
        match error {
            SuiteError::ResetAndRetry(_) => Disposition::ResetAndRetry,
            SuiteError::Retryable(reason) => Disposition::Retryable(reason.clone()),
            SuiteError::NonRetryable(reason) => Disposition::NonRetryable(reason.clone()),
            SuiteError::Query(query) if query.is_relation_not_found() => {
                Disposition::InfrastructureNotReady(format!("table not created: {}", query.message))
            }
            SuiteError::Query(query) => Disposition::NonRetryable(query.to_string()),
            SuiteError::Unexpected(err) => {
                Disposition::NonRetryable(format!("unclassified failure: {:#}", err))
            }
        }
    }
}
