use anyhow::{bail, Context, Result};
use e2e_core::CloudPlatform;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

pub const CREDENTIAL_FILE_ENV: &str = "SNOWFLAKE_CREDENTIAL_FILE";
pub const CLOUD_PLATFORM_ENV: &str = "SF_CLOUD_PLATFORM";
pub const DELIVERY_GUARANTEE_ENV: &str = "ENABLE_DELIVERY_GUARANTEE_TESTS";
pub const MANIFEST_ENV: &str = "E2E_SUITE_MANIFEST";
pub const DEFAULT_MANIFEST: &str = "./e2e_suites.toml";

const ACCOUNT_SUFFIX: &str = ".snowflakecomputing";

/// Startup inputs read from the process environment.
#[derive(Debug, Clone)]
pub struct Environment {
    pub credential_file: PathBuf,
    pub platform: Option<CloudPlatform>,
    pub delivery_guarantee: bool,
    pub manifest: PathBuf,
}

impl Environment {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let credential_file = lookup(CREDENTIAL_FILE_ENV).map(PathBuf::from).with_context(|| {
            format!("Require environment variable {} but it's not set", CREDENTIAL_FILE_ENV)
        })?;
        if !credential_file.is_file() {
            bail!(
                "Provided {} {} does not exist",
                CREDENTIAL_FILE_ENV,
                credential_file.display()
            );
        }

        let platform = lookup(CLOUD_PLATFORM_ENV)
            .map(|p| p.parse::<CloudPlatform>())
            .transpose()?;

        Ok(Self {
            credential_file,
            platform,
            delivery_guarantee: lookup(DELIVERY_GUARANTEE_ENV).as_deref() == Some("True"),
            manifest: lookup(MANIFEST_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST)),
        })
    }

    /// Delivery guarantee groups need the flag and a platform other than GCS.
    pub fn runs_delivery_guarantee(&self) -> bool {
        self.delivery_guarantee
            && self
                .platform
                .map(|p| p.runs_delivery_guarantee())
                .unwrap_or(false)
    }
}

/// Downstream store profile.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub host: String,
    pub user: String,
    pub role: String,
    pub database: String,
    pub schema: String,
    pub warehouse: String,
    pub private_key: String,
    #[serde(default)]
    pub encrypted_private_key: String,
}

impl Credentials {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read credential file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid credential file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let credentials: Self = serde_json::from_str(content)?;
        credentials.account()?;
        Ok(credentials)
    }

    /// Account name taken from `host`, e.g. `myacct.us-east-1` for
    /// `myacct.us-east-1.snowflakecomputing.com:443`.
    pub fn account(&self) -> Result<String> {
        let re = Regex::new(r"[^/]*snowflakecomputing")?;
        let matches: Vec<&str> = re.find_iter(&self.host).map(|m| m.as_str()).collect();
        match matches.as_slice() {
            [found] if found.len() > ACCOUNT_SUFFIX.len() => found
                .strip_suffix(ACCOUNT_SUFFIX)
                .map(str::to_string)
                .with_context(|| format!("Format error in 'host' field: {}", self.host)),
            _ => bail!(
                "Format error in 'host' field {}, expecting account.snowflakecomputing.com:443",
                self.host
            ),
        }
    }

    pub fn template_values(&self, schema_registry: &str) -> connect::TemplateValues {
        connect::TemplateValues {
            host: self.host.clone(),
            user: self.user.clone(),
            role: self.role.clone(),
            database: self.database.clone(),
            schema: self.schema.clone(),
            private_key: self.private_key.clone(),
            encrypted_private_key: self.encrypted_private_key.clone(),
            schema_registry: schema_registry.to_string(),
        }
    }
}

/// Message-queue client settings handed to suites.
pub fn client_config(bootstrap: &str, enable_ssl: bool) -> Map<String, Value> {
    let config = if enable_ssl {
        json!({
            "bootstrap.servers": bootstrap,
            "security.protocol": "SASL_SSL",
            "ssl.ca.location": "./crts/ca-cert",
            "sasl.mechanism": "PLAIN",
            "sasl.username": "client",
            "sasl.password": "client-secret",
        })
    } else {
        json!({ "bootstrap.servers": bootstrap })
    };

    match config {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
