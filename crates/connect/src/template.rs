//! Connector request templates.
//!
//! Each suite names a JSON request template under the template directory.
//! Rendering replaces the literal placeholders below with credentials and
//! the salted connector name, and keeps a copy of the result in the
//! generated directory so later config updates can start from it.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{ConnectError, Result};
use crate::types::ConnectorRequest;

pub const DEFAULT_TEMPLATE_DIR: &str = "./rest_request_template";
pub const DEFAULT_GENERATED_DIR: &str = "./rest_request_generated";

/// Templates carrying this key expect the encrypted private key.
const PASSPHRASE_KEY: &str = "snowflake.private.key.passphrase";

/// Values substituted into connector request templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    pub host: String,
    pub user: String,
    pub role: String,
    pub database: String,
    pub schema: String,
    pub private_key: String,
    pub encrypted_private_key: String,
    pub schema_registry: String,
}

#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template_dir: PathBuf,
    generated_dir: PathBuf,
    values: TemplateValues,
}

impl TemplateRenderer {
    pub fn new(values: TemplateValues) -> Self {
        Self::with_dirs(values, DEFAULT_TEMPLATE_DIR, DEFAULT_GENERATED_DIR)
    }

    pub fn with_dirs(
        values: TemplateValues,
        template_dir: impl Into<PathBuf>,
        generated_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            template_dir: template_dir.into(),
            generated_dir: generated_dir.into(),
            values,
        }
    }

    pub fn generated_dir(&self) -> &Path {
        &self.generated_dir
    }

    /// Replace every placeholder in `content`. The connector name doubles as
    /// the topic name.
    pub fn substitute(&self, content: &str, connector_name: &str) -> String {
        let private_key = if content.contains(PASSPHRASE_KEY) {
            &self.values.encrypted_private_key
        } else {
            &self.values.private_key
        };

        content
            .replace("SNOWFLAKE_PRIVATE_KEY", private_key)
            .replace("SNOWFLAKE_HOST", &self.values.host)
            .replace("SNOWFLAKE_USER", &self.values.user)
            .replace("SNOWFLAKE_DATABASE", &self.values.database)
            .replace("SNOWFLAKE_SCHEMA", &self.values.schema)
            .replace("CONFLUENT_SCHEMA_REGISTRY", &self.values.schema_registry)
            .replace("SNOWFLAKE_TEST_TOPIC", connector_name)
            .replace("SNOWFLAKE_CONNECTOR_NAME", connector_name)
            .replace("SNOWFLAKE_ROLE", &self.values.role)
    }

    /// Render `config_file` for `connector_name`, write the generated copy and
    /// return the parsed request.
    pub async fn render(&self, config_file: &str, connector_name: &str) -> Result<ConnectorRequest> {
        let template_path = self.template_dir.join(config_file);
        let content = fs::read_to_string(&template_path)
            .await
            .map_err(|e| ConnectError::io(&template_path, e))?;

        let rendered = self.substitute(&content, connector_name);

        fs::create_dir_all(&self.generated_dir)
            .await
            .map_err(|e| ConnectError::io(&self.generated_dir, e))?;
        let generated_path = self.generated_dir.join(config_file);
        fs::write(&generated_path, &rendered)
            .await
            .map_err(|e| ConnectError::io(&generated_path, e))?;

        debug!(
            template = %template_path.display(),
            generated = %generated_path.display(),
            connector = %connector_name,
            "Rendered connector request"
        );

        serde_json::from_str(&rendered).map_err(|e| ConnectError::template(config_file, e.to_string()))
    }

    /// Read back a previously generated request.
    pub async fn generated(&self, config_file: &str) -> Result<ConnectorRequest> {
        let path = self.generated_dir.join(config_file);
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| ConnectError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|e| ConnectError::template(config_file, e.to_string()))
    }
}
