use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Selects which enable column of the suite table drives a pass.
///
/// `Clean` switches the scheduler into teardown-only mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestSet {
    Confluent,
    Apache,
    Clean,
}

impl TestSet {
    pub const ALL: [TestSet; 3] = [TestSet::Confluent, TestSet::Apache, TestSet::Clean];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confluent => "confluent",
            Self::Apache => "apache",
            Self::Clean => "clean",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confluent" => Some(Self::Confluent),
            "apache" => Some(Self::Apache),
            "clean" => Some(Self::Clean),
            _ => None,
        }
    }

    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

impl FromStr for TestSet {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownTestSet(s.to_string()))
    }
}

impl fmt::Display for TestSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
