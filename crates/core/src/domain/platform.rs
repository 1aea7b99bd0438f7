use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Cloud hosting the downstream store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloudPlatform {
    Aws,
    Azure,
    Gcs,
}

impl CloudPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Azure => "AZURE",
            Self::Gcs => "GCS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AWS" => Some(Self::Aws),
            "AZURE" => Some(Self::Azure),
            "GCS" => Some(Self::Gcs),
            _ => None,
        }
    }

    /// GCS deployments skip the delivery guarantee suites.
    pub fn runs_delivery_guarantee(&self) -> bool {
        !matches!(self, Self::Gcs)
    }
}

impl FromStr for CloudPlatform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownPlatform(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform() {
        assert_eq!(CloudPlatform::parse("AWS"), Some(CloudPlatform::Aws));
        assert_eq!(CloudPlatform::parse("AZURE"), Some(CloudPlatform::Azure));
        assert_eq!(CloudPlatform::parse("GCS"), Some(CloudPlatform::Gcs));
        assert_eq!(CloudPlatform::parse("aws"), None);
    }

    #[test]
    fn test_delivery_guarantee_gate() {
        assert!(CloudPlatform::Aws.runs_delivery_guarantee());
        assert!(CloudPlatform::Azure.runs_delivery_guarantee());
        assert!(!CloudPlatform::Gcs.runs_delivery_guarantee());
    }
}
