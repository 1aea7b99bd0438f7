//! Event types emitted while a verification pass runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Which path a scheduler pass took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassMode {
    Run,
    Cleanup,
}

/// All events a scheduler pass can publish
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // Pass events
    /// A scheduler pass began
    #[serde(rename = "pass.started")]
    PassStarted {
        pass_id: Uuid,
        label: String,
        mode: PassMode,
        suites: usize,
        rounds: u32,
    },

    /// A scheduler pass ended, successfully or not
    #[serde(rename = "pass.finished")]
    PassFinished { pass_id: Uuid, success: bool },

    /// A send/verify round began
    #[serde(rename = "round.started")]
    RoundStarted { pass_id: Uuid, round: u32 },

    // Suite events
    /// Connector creation was requested for a suite
    #[serde(rename = "suite.provisioned")]
    ConnectorProvisioned {
        pass_id: Uuid,
        suite: String,
        config_file: String,
    },

    /// A suite finished producing its input for a round
    #[serde(rename = "suite.sent")]
    SuiteSent {
        pass_id: Uuid,
        suite: String,
        round: u32,
    },

    /// One verification attempt failed and was classified
    #[serde(rename = "suite.verify_attempt_failed")]
    VerifyAttemptFailed {
        pass_id: Uuid,
        suite: String,
        round: u32,
        attempt: u32,
        disposition: String,
        reason: String,
    },

    /// A suite's verification for a round passed
    #[serde(rename = "suite.verified")]
    SuiteVerified {
        pass_id: Uuid,
        suite: String,
        round: u32,
        calls: u32,
    },

    /// A suite failed terminally; the pass aborts
    #[serde(rename = "suite.failed")]
    SuiteFailed {
        pass_id: Uuid,
        suite: String,
        round: Option<u32>,
        reason: String,
    },

    /// A suite's teardown completed
    #[serde(rename = "suite.cleaned")]
    SuiteCleaned { pass_id: Uuid, suite: String },

    /// A suite's teardown failed; the batch continues
    #[serde(rename = "suite.clean_failed")]
    CleanFailed {
        pass_id: Uuid,
        suite: String,
        error: String,
    },
}

impl Event {
    /// Get the pass this event belongs to
    pub fn pass_id(&self) -> Uuid {
        match self {
            Event::PassStarted { pass_id, .. }
            | Event::PassFinished { pass_id, .. }
            | Event::RoundStarted { pass_id, .. }
            | Event::ConnectorProvisioned { pass_id, .. }
            | Event::SuiteSent { pass_id, .. }
            | Event::VerifyAttemptFailed { pass_id, .. }
            | Event::SuiteVerified { pass_id, .. }
            | Event::SuiteFailed { pass_id, .. }
            | Event::SuiteCleaned { pass_id, .. }
            | Event::CleanFailed { pass_id, .. } => *pass_id,
        }
    }

    /// Get the suite name associated with this event, if any
    pub fn suite(&self) -> Option<&str> {
        match self {
            Event::ConnectorProvisioned { suite, .. }
            | Event::SuiteSent { suite, .. }
            | Event::VerifyAttemptFailed { suite, .. }
            | Event::SuiteVerified { suite, .. }
            | Event::SuiteFailed { suite, .. }
            | Event::SuiteCleaned { suite, .. }
            | Event::CleanFailed { suite, .. } => Some(suite),
            Event::PassStarted { .. } | Event::PassFinished { .. } | Event::RoundStarted { .. } => {
                None
            }
        }
    }
}
