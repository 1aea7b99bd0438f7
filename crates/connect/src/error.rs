use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid connector template {file}: {reason}")]
    Template { file: String, reason: String },

    #[error("Connector not found: {0}")]
    ConnectorNotFound(String),

    #[error("Unexpected response status {status}: {body}")]
    InvalidResponse { status: u16, body: String },
}

impl ConnectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn template(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Template {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectError>;
