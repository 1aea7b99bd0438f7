use e2e_core::{connector_name, NameSalt};
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ConnectError, Result};
use crate::template::TemplateRenderer;
use crate::types::ConnectorInfo;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DELETE_ATTEMPTS: u32 = 3;
const DELETE_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Client for the connector framework's REST control plane.
pub struct ConnectClient {
    base_url: String,
    client: Client,
    renderer: TemplateRenderer,
    delete_attempts: u32,
    delete_retry_wait: Duration,
}

impl ConnectClient {
    /// `address` is either `host:port` or a full base URL.
    pub fn new(address: &str, renderer: TemplateRenderer) -> Self {
        Self::with_client(address, renderer, Client::new())
    }

    pub fn with_client(address: &str, renderer: TemplateRenderer, client: Client) -> Self {
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address.trim_end_matches('/'))
        };

        Self {
            base_url,
            client,
            renderer,
            delete_attempts: DELETE_ATTEMPTS,
            delete_retry_wait: DELETE_RETRY_WAIT,
        }
    }

    /// How often, and how far apart, a stale connector delete is attempted
    /// before creation while the control plane is still coming up.
    pub fn with_delete_retry(mut self, attempts: u32, wait: Duration) -> Self {
        self.delete_attempts = attempts.max(1);
        self.delete_retry_wait = wait;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn connector_url(&self, name: &str) -> String {
        format!("{}/connectors/{}", self.base_url, name)
    }

    /// Render the template, replace any connector of the same name and
    /// create it. Returns the connector name.
    pub async fn create_connector(&self, config_file: &str, salt: &NameSalt) -> Result<String> {
        let name = connector_name(config_file, salt);
        info!(config_file = %config_file, connector = %name, "Creating connector");

        let request = self.renderer.render(config_file, &name).await?;
        self.delete_stale(&name).await;

        let response = self
            .client
            .post(format!("{}/connectors", self.base_url))
            .json(&request)
            .send()
            .await?;
        let created: ConnectorInfo = self.handle_response(response).await?;
        info!(connector = %created.name, tasks = created.tasks.len(), "Connector created");

        match self.list_connectors().await {
            Ok(names) => debug!(connectors = ?names, "Connectors registered"),
            Err(e) => debug!(error = %e, "Failed to list connectors"),
        }

        Ok(name)
    }

    /// Best effort; gives up with a warning after the last attempt.
    async fn delete_stale(&self, name: &str) {
        let url = self.connector_url(name);

        for attempt in 1..=self.delete_attempts {
            match self
                .client
                .delete(&url)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();
                    debug!(url = %url, status = %status, "Delete request returned");
                    if status == StatusCode::NOT_FOUND || status.is_success() {
                        return;
                    }
                }
                Err(e) => warn!(url = %url, attempt, error = %e, "Delete request failed"),
            }

            if attempt < self.delete_attempts {
                info!(
                    wait_secs = self.delete_retry_wait.as_secs(),
                    "Waiting for connect to accept connections"
                );
                tokio::time::sleep(self.delete_retry_wait).await;
            }
        }

        warn!(url = %url, "Connector delete request not successful");
    }

    pub async fn restart(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/restart", self.connector_url(name)))
            .send()
            .await?;
        self.expect_success(response, name).await?;
        info!(connector = %name, "Restarted connector");
        Ok(())
    }

    pub async fn pause(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/pause", self.connector_url(name)))
            .send()
            .await?;
        self.expect_success(response, name).await?;
        info!(connector = %name, "Paused connector");
        Ok(())
    }

    pub async fn resume(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .put(format!("{}/resume", self.connector_url(name)))
            .send()
            .await?;
        self.expect_success(response, name).await?;
        info!(connector = %name, "Resumed connector");
        Ok(())
    }

    /// Deleting a connector that does not exist succeeds.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.connector_url(name))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(connector = %name, "Connector already absent");
            return Ok(());
        }
        self.expect_success(response, name).await?;
        info!(connector = %name, "Deleted connector");
        Ok(())
    }

    /// Delete the salted connector created from `config_file`.
    pub async fn close(&self, config_file: &str, salt: &NameSalt) -> Result<()> {
        self.delete(&connector_name(config_file, salt)).await
    }

    /// Apply `overrides` on top of the generated config for `config_file`.
    pub async fn update_config(
        &self,
        config_file: &str,
        name: &str,
        overrides: &Map<String, Value>,
    ) -> Result<()> {
        let mut config = self.renderer.generated(config_file).await?.config;
        for (key, value) in overrides {
            config.insert(key.clone(), value.clone());
        }

        let response = self
            .client
            .put(format!("{}/config", self.connector_url(name)))
            .json(&config)
            .send()
            .await?;
        self.expect_success(response, name).await?;
        info!(connector = %name, keys = overrides.len(), "Updated connector config");
        Ok(())
    }

    pub async fn list_connectors(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/connectors", self.base_url))
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn expect_success(&self, response: reqwest::Response, name: &str) -> Result<()> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ConnectError::ConnectorNotFound(name.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::InvalidResponse {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::InvalidResponse {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }
}
