//! Error types for placement reports.

use thiserror::Error;

/// Errors surfaced by the query builder, report runner and exporters.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The data store could not be reached or rejected the credentials.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The statement failed to execute.
    #[error("Query error: {0}")]
    Query(String),

    /// Invalid configuration or connection string.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A result table could not be serialized.
    #[error("Export error: {0}")]
    Export(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Query(_) => "Query Error",
            Self::Config(_) => "Configuration Error",
            Self::Export(_) => "Export Error",
            Self::Io(_) => "I/O Error",
        }
    }
}

impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
