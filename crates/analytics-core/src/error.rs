use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while ingesting analytics nodes.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The service credential is malformed or the token exchange was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A reporting query failed or returned an unexpected shape.
    #[error("Reporting query failed: {0}")]
    RemoteQuery(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or encoded.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The node sink refused a node.
    #[error("Node sink error: {0}")]
    Sink(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalyticsError {
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    pub fn remote_query(message: impl Into<String>) -> Self {
        Self::RemoteQuery(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// `true` for failures raised while obtaining an access token.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// `true` for failures raised by a reporting query.
    pub fn is_remote_query(&self) -> bool {
        matches!(self, Self::RemoteQuery(_))
    }
}

/// Convenience alias used throughout the analytics crates.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
