//! External collaborators the orchestrator and suites talk to.
//!
//! Only the connector lifecycle is used by the scheduler itself; the store,
//! producer and topic admin are what in-process suites are built on. The
//! bundled binary has no in-process suites, so it never implements them.

use async_trait::async_trait;
use connect::ConnectClient;
use e2e_core::NameSalt;
use std::collections::BTreeMap;

use crate::error::QueryError;

/// One row returned by the downstream store.
pub type Row = Vec<serde_json::Value>;

/// Connector-framework control plane. Every call is a network round trip;
/// failures surface immediately and are never retried by the scheduler.
#[async_trait]
pub trait ConnectorLifecycle: Send + Sync {
    /// Provision the connector described by `config_file`. Returns the
    /// salted connector name.
    async fn create(&self, config_file: &str, salt: &NameSalt) -> anyhow::Result<String>;
    async fn restart(&self, name: &str) -> anyhow::Result<()>;
    async fn pause(&self, name: &str) -> anyhow::Result<()>;
    async fn resume(&self, name: &str) -> anyhow::Result<()>;
    async fn delete(&self, name: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl ConnectorLifecycle for ConnectClient {
    async fn create(&self, config_file: &str, salt: &NameSalt) -> anyhow::Result<String> {
        Ok(self.create_connector(config_file, salt).await?)
    }

    async fn restart(&self, name: &str) -> anyhow::Result<()> {
        Ok(ConnectClient::restart(self, name).await?)
    }

    async fn pause(&self, name: &str) -> anyhow::Result<()> {
        Ok(ConnectClient::pause(self, name).await?)
    }

    async fn resume(&self, name: &str) -> anyhow::Result<()> {
        Ok(ConnectClient::resume(self, name).await?)
    }

    async fn delete(&self, name: &str) -> anyhow::Result<()> {
        Ok(ConnectClient::delete(self, name).await?)
    }
}

/// Downstream query connection. A missing relation must be reported as
/// [`QueryError::relation_not_found`] so verification keeps retrying.
#[async_trait]
pub trait DownstreamStore: Send + Sync {
    async fn execute(&self, statement: &str) -> Result<Vec<Row>, QueryError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub partition: Option<i32>,
    pub headers: Vec<(String, Vec<u8>)>,
}

impl Record {
    pub fn value(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Message-queue producer. `send` may buffer; `flush` blocks until every
/// buffered record is delivered.
#[async_trait]
pub trait RecordProducer: Send + Sync {
    async fn send(&self, topic: &str, record: Record) -> anyhow::Result<()>;
    async fn flush(&self) -> anyhow::Result<()>;
}

#[async_trait]
pub trait TopicAdmin: Send + Sync {
    async fn create_topic(&self, topic: &str, partitions: u32) -> anyhow::Result<()>;
    async fn delete_topic(&self, topic: &str) -> anyhow::Result<()>;
    /// Grow `topic` to `total` partitions.
    async fn create_partitions(&self, topic: &str, total: u32) -> anyhow::Result<()>;
    /// Topic configuration entries by name.
    async fn describe_topic(&self, topic: &str) -> anyhow::Result<BTreeMap<String, String>>;
}
