mod bq_error;
mod parser;

use thiserror::Error;

pub use bq_error::{BigQueryError, QueryErrorLocation};
pub use parser::{parse_bq_error, ErrorContext};

#[derive(Error, Debug)]
pub enum SchemaSyncError {
    #[error("BigQuery error: {0}")]
    BigQuery(#[from] BigQueryError),

    #[error("Remote store error: {0}")]
    Store(String),

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema validation failed: {0}")]
    Validation(String),

    #[error("Version {0} not found")]
    VersionNotFound(u32),

    #[error("Failed to write migration script: {0}")]
    MigrationScript(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Error parsing configuration file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaSyncError {
    /// Errors caused by user input rather than the remote service.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            SchemaSyncError::ConfigNotFound(_)
                | SchemaSyncError::Config(_)
                | SchemaSyncError::Yaml(_)
                | SchemaSyncError::Validation(_)
                | SchemaSyncError::VersionNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SchemaSyncError>;
