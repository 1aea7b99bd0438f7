//! Suite manifest: which external suites exist, how to invoke them, and
//! how they are grouped into passes.

use e2e_core::TestSet;
use orchestrator::TestSetTable;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid manifest: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Enable flag per test set. All three are required.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnableFlags {
    pub confluent: bool,
    pub apache: bool,
    pub clean: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteSpec {
    pub name: String,
    pub config_file: String,
    pub send: Vec<String>,
    pub verify: Vec<String>,
    pub clean: Vec<String>,
    pub enabled: EnableFlags,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Standard,
    DeliveryGuarantee,
    Stress,
    Proxy,
}

fn default_rounds() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub name: String,
    pub kind: GroupKind,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    pub suites: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub suites: Vec<SuiteSpec>,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

impl Manifest {
    /// Read, parse and validate.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ManifestError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for suite in &self.suites {
            if !names.insert(suite.name.as_str()) {
                return Err(invalid(format!("suite {} is defined more than once", suite.name)));
            }
            if suite.config_file.trim().is_empty() {
                return Err(invalid(format!("suite {} has an empty config_file", suite.name)));
            }
            for (phase, argv) in [("send", &suite.send), ("verify", &suite.verify), ("clean", &suite.clean)] {
                if argv.first().map_or(true, |program| program.trim().is_empty()) {
                    return Err(invalid(format!("suite {} has an empty {} command", suite.name, phase)));
                }
            }
        }

        for group in &self.groups {
            if group.suites.is_empty() {
                return Err(invalid(format!("group {} lists no suites", group.name)));
            }
            if group.rounds == 0 {
                return Err(invalid(format!("group {} must run at least one round", group.name)));
            }
            if let Some(unknown) = group.suites.iter().find(|s| !names.contains(s.as_str())) {
                return Err(invalid(format!(
                    "group {} references unknown suite {}",
                    group.name, unknown
                )));
            }
            let mut listed = HashSet::new();
            if let Some(repeated) = group.suites.iter().find(|s| !listed.insert(s.as_str())) {
                return Err(invalid(format!(
                    "group {} lists suite {} more than once",
                    group.name, repeated
                )));
            }
        }

        Ok(())
    }

    pub fn suite(&self, name: &str) -> Option<&SuiteSpec> {
        self.suites.iter().find(|s| s.name == name)
    }

    pub fn groups_of(&self, kind: GroupKind) -> impl Iterator<Item = &GroupSpec> {
        self.groups.iter().filter(move |g| g.kind == kind)
    }

    /// Enable table over the suites of one group.
    pub fn table_for(&self, group: &GroupSpec) -> TestSetTable {
        let mut table = TestSetTable::new();
        for spec in group.suites.iter().filter_map(|name| self.suite(name)) {
            table.set(TestSet::Confluent, spec.name.as_str(), spec.enabled.confluent);
            table.set(TestSet::Apache, spec.name.as_str(), spec.enabled.apache);
            table.set(TestSet::Clean, spec.name.as_str(), spec.enabled.clean);
        }
        table
    }
}

fn invalid(msg: String) -> ManifestError {
    ManifestError::Invalid(msg)
}
