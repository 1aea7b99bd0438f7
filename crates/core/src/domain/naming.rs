use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-run suffix appended to every resource name so that concurrent runs
/// against the same cluster and database never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameSalt(String);

impl NameSalt {
    pub fn new(salt: impl Into<String>) -> Self {
        Self(salt.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append the salt to a base resource name.
    pub fn apply(&self, base: &str) -> String {
        format!("{}{}", base, self.0)
    }
}

impl fmt::Display for NameSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Connector name for a request template: the file name up to its first
/// `.`, followed by the salt. The topic uses the same name.
pub fn connector_name(config_file: &str, salt: &NameSalt) -> String {
    let stem = config_file.split('.').next().unwrap_or(config_file);
    salt.apply(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connector_name_strips_extension() {
        let salt = NameSalt::new("_a1b2");
        assert_eq!(
            connector_name("travis_correct_string_json.json", &salt),
            "travis_correct_string_json_a1b2"
        );
    }

    #[test]
    fn test_connector_name_uses_first_dot() {
        let salt = NameSalt::new("_x");
        assert_eq!(connector_name("a.b.json", &salt), "a_x");
    }

    #[test]
    fn test_connector_name_without_extension() {
        let salt = NameSalt::default();
        assert_eq!(connector_name("plain", &salt), "plain");
    }
}
