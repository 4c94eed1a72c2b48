use thiserror::Error;

/// A BigQuery API failure, classified by status code and reason so the CLI
/// can print an actionable hint.
#[derive(Debug, Clone, Error)]
pub enum BigQueryError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Invalid credentials: {reason}{}", path_suffix(.path))]
    InvalidCredentials {
        path: Option<String>,
        reason: String,
    },

    #[error("Invalid SQL: {message}{}{}", location_suffix(.location), preview_suffix(.sql_preview))]
    InvalidQuery {
        sql_preview: String,
        message: String,
        location: Option<QueryErrorLocation>,
    },

    #[error("Table not found: {project}.{dataset}.{table}")]
    TableNotFound {
        project: String,
        dataset: String,
        table: String,
    },

    #[error("Dataset not found: {project}.{dataset}")]
    DatasetNotFound { project: String, dataset: String },

    #[error("Access denied to {resource}{}", permission_suffix(.required_permission))]
    AccessDenied {
        resource: String,
        required_permission: Option<String>,
    },

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Already exists: {resource}")]
    AlreadyExists { resource: String },

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("BigQuery error{}: {message}", code_suffix(.code))]
    Unknown {
        code: Option<String>,
        message: String,
    },
}

fn path_suffix(path: &Option<String>) -> String {
    path.as_ref().map(|p| format!(" (path: {p})")).unwrap_or_default()
}

fn location_suffix(location: &Option<QueryErrorLocation>) -> String {
    match location {
        Some(QueryErrorLocation { line: Some(line), column: Some(col) }) => {
            format!(" (line {line}, column {col})")
        }
        Some(QueryErrorLocation { line: Some(line), column: None }) => format!(" (line {line})"),
        _ => String::new(),
    }
}

fn preview_suffix(sql_preview: &str) -> String {
    if sql_preview.is_empty() {
        String::new()
    } else {
        format!("\n\nSQL preview:\n  {sql_preview}")
    }
}

fn permission_suffix(permission: &Option<String>) -> String {
    permission.as_ref().map(|p| format!(" (requires {p})")).unwrap_or_default()
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryErrorLocation {
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl BigQueryError {
    pub fn suggestion(&self) -> String {
        match self {
            BigQueryError::AuthenticationFailed { .. } => {
                "Try:\n  \
                 • Run: gcloud auth application-default login\n  \
                 • Or set service_account_key_path in the config file".to_string()
            }

            BigQueryError::InvalidCredentials { path, .. } => {
                let path_info = path.as_ref()
                    .map(|p| format!(" ({p})"))
                    .unwrap_or_default();
                format!(
                    "Invalid service account key{path_info}:\n  \
                     • Check service_account_key_path in the config file\n  \
                     • Verify the key has not been revoked"
                )
            }

            BigQueryError::InvalidQuery { .. } => {
                "The metadata query was rejected:\n  \
                 • Check that the schema_versions table has the expected columns\n  \
                 • Run with --verbose to see the rendered SQL".to_string()
            }

            BigQueryError::TableNotFound { project, dataset, table } => {
                format!(
                    "Verify the table exists:\n  \
                     • Run: bq show {project}:{dataset}.{table}\n  \
                     • Check table_id and dataset_id in the config file"
                )
            }

            BigQueryError::DatasetNotFound { project, dataset } => {
                format!(
                    "Create the dataset or fix dataset_id:\n  \
                     • Run: bq mk --dataset {project}:{dataset}"
                )
            }

            BigQueryError::AccessDenied { resource, required_permission } => {
                let perm = required_permission.as_deref().unwrap_or("bigquery.tables.get");
                format!(
                    "Request access to {resource}:\n  \
                     • Required permission: {perm}\n  \
                     • Contact your project admin"
                )
            }

            BigQueryError::QuotaExceeded { .. } => {
                "Quota exceeded:\n  \
                 • Wait and retry later\n  \
                 • Request a quota increase in the Cloud Console".to_string()
            }

            BigQueryError::AlreadyExists { resource } => {
                format!("{resource} already exists; nothing to create")
            }

            BigQueryError::ConnectionFailed { .. } => {
                "Connection failed:\n  \
                 • Check your network connection\n  \
                 • Verify the BigQuery API is enabled for the project".to_string()
            }

            BigQueryError::Unknown { .. } => {
                "An unexpected error occurred:\n  \
                 • Run with --verbose for details\n  \
                 • Check BigQuery status: https://status.cloud.google.com/".to_string()
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            BigQueryError::AuthenticationFailed { .. } => "AUTH_FAILED",
            BigQueryError::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            BigQueryError::InvalidQuery { .. } => "INVALID_QUERY",
            BigQueryError::TableNotFound { .. } => "TABLE_NOT_FOUND",
            BigQueryError::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            BigQueryError::AccessDenied { .. } => "ACCESS_DENIED",
            BigQueryError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            BigQueryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            BigQueryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            BigQueryError::Unknown { .. } => "UNKNOWN",
        }
    }

    pub fn is_table_not_found(&self) -> bool {
        matches!(self, BigQueryError::TableNotFound { .. })
    }
}
