use gcp_bigquery_client::error::{BQError, ResponseError};
use regex::Regex;
use super::bq_error::{BigQueryError, QueryErrorLocation};

pub fn parse_bq_error(error: BQError, context: ErrorContext) -> BigQueryError {
    match &error {
        BQError::ResponseError { error: resp } => parse_response_error(resp, context),

        BQError::RequestError(req_err) => BigQueryError::ConnectionFailed {
            reason: context.annotate(req_err.to_string()),
        },

        BQError::NoToken => BigQueryError::AuthenticationFailed {
            reason: "No authentication token available".to_string(),
        },

        BQError::AuthError(auth_err) => BigQueryError::AuthenticationFailed {
            reason: format!("{:?}", auth_err),
        },

        BQError::YupAuthError(yup_err) => BigQueryError::AuthenticationFailed {
            reason: yup_err.to_string(),
        },

        BQError::InvalidServiceAccountKey(io_err)
        | BQError::InvalidServiceAccountAuthenticator(io_err) => BigQueryError::InvalidCredentials {
            path: context.credentials_path,
            reason: io_err.to_string(),
        },

        BQError::InvalidApplicationDefaultCredentialsAuthenticator(io_err) => {
            BigQueryError::AuthenticationFailed {
                reason: format!("application default credentials unavailable: {io_err}"),
            }
        }

        BQError::ConnectionPoolError(msg) => BigQueryError::ConnectionFailed {
            reason: context.annotate(msg.clone()),
        },

        _ => BigQueryError::Unknown {
            code: None,
            message: context.annotate(error.to_string()),
        },
    }
}

fn parse_response_error(resp: &ResponseError, context: ErrorContext) -> BigQueryError {
    let status = resp.error.code;
    let message = &resp.error.message;
    let reason = resp.error.errors.first().and_then(|e| e.get("reason").map(|s| s.as_str()));

    match (status, reason) {
        (400, Some("invalidQuery")) => BigQueryError::InvalidQuery {
            sql_preview: context.sql.unwrap_or_default(),
            message: message.clone(),
            location: extract_query_location(message),
        },

        (403, Some("accessDenied")) => BigQueryError::AccessDenied {
            resource: context.resource.unwrap_or_else(|| "resource".to_string()),
            required_permission: extract_required_permission(message),
        },

        (403, Some("quotaExceeded")) | (403, Some("rateLimitExceeded")) => {
            BigQueryError::QuotaExceeded {
                message: message.clone(),
            }
        }

        (404, _) => parse_not_found_error(message, &context),

        (409, _) => BigQueryError::AlreadyExists {
            resource: context.resource.unwrap_or_else(|| message.clone()),
        },

        (500..=599, _) => BigQueryError::Unknown {
            code: Some(format!("HTTP_{status}")),
            message: context.annotate(format!("BigQuery server error: {message}")),
        },

        _ => BigQueryError::Unknown {
            code: reason.map(|s| s.to_string()),
            message: context.annotate(message.clone()),
        },
    }
}

fn parse_not_found_error(message: &str, context: &ErrorContext) -> BigQueryError {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("dataset") {
        if let Some(caps) = Regex::new(r"(?i)dataset\s+([^:\s]+):([^\s]+)")
            .ok()
            .and_then(|re| re.captures(message))
        {
            return BigQueryError::DatasetNotFound {
                project: caps[1].to_string(),
                dataset: caps[2].to_string(),
            };
        }
    }

    if let Some(caps) = Regex::new(r"(?i)table\s+([^:\s]+):([^.\s]+)\.([^\s]+)")
        .ok()
        .and_then(|re| re.captures(message))
    {
        return BigQueryError::TableNotFound {
            project: caps[1].to_string(),
            dataset: caps[2].to_string(),
            table: caps[3].to_string(),
        };
    }

    // The REST API sometimes answers a bare "Not found" for get-table.
    if let (Some(project), Some(dataset), Some(table)) =
        (&context.project, &context.dataset, &context.table)
    {
        return BigQueryError::TableNotFound {
            project: project.clone(),
            dataset: dataset.clone(),
            table: table.clone(),
        };
    }

    BigQueryError::Unknown {
        code: Some("notFound".to_string()),
        message: context.annotate(message.to_string()),
    }
}

fn extract_query_location(message: &str) -> Option<QueryErrorLocation> {
    let re = Regex::new(r"\[(\d+):(\d+)\]").ok()?;
    let caps = re.captures(message)?;
    Some(QueryErrorLocation {
        line: caps[1].parse().ok(),
        column: caps[2].parse().ok(),
    })
}

fn extract_required_permission(message: &str) -> Option<String> {
    let re = Regex::new(r"(bigquery\.[a-zA-Z.]+[a-zA-Z])").ok()?;
    re.captures(message).map(|caps| caps[1].to_string())
}

/// What the failing request was about, used to make BigQuery errors specific.
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub sql: Option<String>,
    pub operation: Option<String>,
    pub resource: Option<String>,
    pub project: Option<String>,
    pub dataset: Option<String>,
    pub table: Option<String>,
    pub credentials_path: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        let full_sql = sql.into();
        self.sql = Some(match full_sql.char_indices().nth(500) {
            Some((idx, _)) => format!("{}...", &full_sql[..idx]),
            None => full_sql,
        });
        self
    }

    pub fn with_operation(mut self, op: impl Into<String>) -> Self {
        self.operation = Some(op.into());
        self
    }

    pub fn with_table(
        mut self,
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        let (project, dataset, table) = (project.into(), dataset.into(), table.into());
        self.resource = Some(format!("{project}.{dataset}.{table}"));
        self.project = Some(project);
        self.dataset = Some(dataset);
        self.table = Some(table);
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<String>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Appends the failing operation, when known, to an error message.
    fn annotate(&self, message: String) -> String {
        match &self.operation {
            Some(op) => format!("{message} (during {op})"),
            None => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_query_location() {
        let loc = extract_query_location("Unrecognized name: versoin at [1:8]").unwrap();
        assert_eq!(loc.line, Some(1));
        assert_eq!(loc.column, Some(8));
        assert!(extract_query_location("no location here").is_none());
    }

    #[test]
    fn test_extract_required_permission() {
        let msg = "User does not have bigquery.tables.updateData permission.";
        assert_eq!(
            extract_required_permission(msg),
            Some("bigquery.tables.updateData".to_string())
        );
        assert!(extract_required_permission("Access denied").is_none());
    }

    #[test]
    fn test_parse_not_found_table_from_message() {
        let err = parse_not_found_error(
            "Not found: Table my-project:monitoring.schema_versions",
            &ErrorContext::new(),
        );
        match err {
            BigQueryError::TableNotFound { project, dataset, table } => {
                assert_eq!(project, "my-project");
                assert_eq!(dataset, "monitoring");
                assert_eq!(table, "schema_versions");
            }
            other => panic!("Expected TableNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_not_found_dataset_from_message() {
        let err = parse_not_found_error("Not found: Dataset my-project:missing", &ErrorContext::new());
        assert!(matches!(err, BigQueryError::DatasetNotFound { ref dataset, .. } if dataset == "missing"));
    }

    #[test]
    fn test_parse_not_found_falls_back_to_context() {
        let ctx = ErrorContext::new().with_table("proj", "ds", "events");
        let err = parse_not_found_error("Not found", &ctx);
        assert!(err.is_table_not_found());
    }

    #[test]
    fn test_parse_not_found_generic() {
        let err = parse_not_found_error("Not found", &ErrorContext::new());
        assert!(matches!(err, BigQueryError::Unknown { code: Some(ref c), .. } if c == "notFound"));
    }

    #[test]
    fn test_unknown_errors_name_the_operation() {
        let ctx = ErrorContext::new().with_operation("insert_row");
        let err = parse_bq_error(BQError::ConnectionPoolError("pool closed".into()), ctx);
        assert_eq!(err.to_string(), "Connection failed: pool closed (during insert_row)");

        let ctx = ErrorContext::new().with_operation("get_table_schema");
        let err = parse_not_found_error("Not found", &ctx);
        assert_eq!(err.to_string(), "BigQuery error [notFound]: Not found (during get_table_schema)");

        let err = parse_not_found_error("Not found", &ErrorContext::new());
        assert_eq!(err.to_string(), "BigQuery error [notFound]: Not found");
    }

    #[test]
    fn test_error_context_with_table() {
        let ctx = ErrorContext::new()
            .with_operation("get_table_schema")
            .with_table("proj", "ds", "events");
        assert_eq!(ctx.resource.as_deref(), Some("proj.ds.events"));
        assert_eq!(ctx.operation.as_deref(), Some("get_table_schema"));
    }

    #[test]
    fn test_error_context_sql_truncation() {
        let long_sql = "SELECT ".to_string() + &"version, ".repeat(100);
        let ctx = ErrorContext::new().with_sql(long_sql);
        let sql = ctx.sql.unwrap();
        assert!(sql.ends_with("..."));
        assert_eq!(sql.chars().count(), 503);
    }
}
