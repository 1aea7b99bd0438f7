use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a scheduler pass a suite was in when something happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Provision,
    Send,
    Verify,
    Clean,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provision => "provision",
            Self::Send => "send",
            Self::Verify => "verify",
            Self::Clean => "clean",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
