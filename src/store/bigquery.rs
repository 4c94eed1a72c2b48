use std::path::Path;
use async_trait::async_trait;
use gcp_bigquery_client::Client;
use gcp_bigquery_client::model::field_type::FieldType;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::model::query_response::ResultSet;
use gcp_bigquery_client::model::table::Table;
use gcp_bigquery_client::model::table_data_insert_all_request::TableDataInsertAllRequest;
use gcp_bigquery_client::model::table_field_schema::TableFieldSchema;
use gcp_bigquery_client::model::table_schema::TableSchema;
use tracing::{debug, info};
use crate::error::{parse_bq_error, BigQueryError, ErrorContext, Result, SchemaSyncError};
use crate::schema::{BqType, Field, FieldMode};
use super::{RemoteStore, Row, RowQuery, TableRef};

#[derive(Clone)]
pub struct BigQueryStore {
    client: Client,
    project_id: String,
}

impl BigQueryStore {
    /// Authenticates with the service account key when one is given, with
    /// application default credentials otherwise.
    pub async fn new(project_id: impl Into<String>, key_path: Option<&Path>) -> Result<Self> {
        let client = match key_path {
            Some(path) => {
                let path_str = path.display().to_string();
                Client::from_service_account_key_file(&path_str)
                    .await
                    .map_err(|e| {
                        let ctx = ErrorContext::new()
                            .with_operation("client_init")
                            .with_credentials_path(&path_str);
                        SchemaSyncError::BigQuery(parse_bq_error(e, ctx))
                    })?
            }
            None => Client::from_application_default_credentials()
                .await
                .map_err(|e| {
                    let ctx = ErrorContext::new().with_operation("client_init");
                    SchemaSyncError::BigQuery(parse_bq_error(e, ctx))
                })?,
        };

        Ok(Self {
            client,
            project_id: project_id.into(),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn to_field_type(bq_type: &BqType) -> Result<FieldType> {
        Ok(match bq_type {
            BqType::String => FieldType::String,
            BqType::Bytes => FieldType::Bytes,
            BqType::Integer => FieldType::Integer,
            BqType::Int64 => FieldType::Int64,
            BqType::Float => FieldType::Float,
            BqType::Float64 => FieldType::Float64,
            BqType::Numeric => FieldType::Numeric,
            BqType::Bignumeric => FieldType::Bignumeric,
            BqType::Boolean => FieldType::Boolean,
            BqType::Bool => FieldType::Bool,
            BqType::Date => FieldType::Date,
            BqType::Datetime => FieldType::Datetime,
            BqType::Time => FieldType::Time,
            BqType::Timestamp => FieldType::Timestamp,
            BqType::Geography => FieldType::Geography,
            BqType::Json => FieldType::Json,
            BqType::Record => FieldType::Record,
            BqType::Other(name) => {
                return Err(SchemaSyncError::Store(format!(
                    "cannot create a column of unsupported type '{name}'"
                )))
            }
        })
    }

    fn from_field_type(field_type: &FieldType) -> BqType {
        match field_type {
            FieldType::String => BqType::String,
            FieldType::Bytes => BqType::Bytes,
            FieldType::Integer => BqType::Integer,
            FieldType::Int64 => BqType::Int64,
            FieldType::Float => BqType::Float,
            FieldType::Float64 => BqType::Float64,
            FieldType::Numeric => BqType::Numeric,
            FieldType::Bignumeric => BqType::Bignumeric,
            FieldType::Boolean => BqType::Boolean,
            FieldType::Bool => BqType::Bool,
            FieldType::Date => BqType::Date,
            FieldType::Datetime => BqType::Datetime,
            FieldType::Time => BqType::Time,
            FieldType::Timestamp => BqType::Timestamp,
            FieldType::Geography => BqType::Geography,
            FieldType::Json => BqType::Json,
            FieldType::Record | FieldType::Struct => BqType::Record,
            other => BqType::from(format!("{:?}", other).to_uppercase()),
        }
    }

    fn build_field_schema(field: &Field) -> Result<TableFieldSchema> {
        let bq_type = field.field_type.as_ref().ok_or_else(|| {
            SchemaSyncError::Store(format!("field '{}' has no type", field.name))
        })?;

        let mut tfs = TableFieldSchema::new(&field.name, Self::to_field_type(bq_type)?);
        tfs.mode = Some(field.mode.as_str().to_string());
        tfs.description = field.description.clone();
        Ok(tfs)
    }

    fn field_from_api(tfs: &TableFieldSchema) -> Field {
        Field {
            name: tfs.name.clone(),
            field_type: Some(Self::from_field_type(&tfs.r#type)),
            mode: FieldMode::from_api(tfs.mode.as_deref()),
            description: tfs.description.clone().filter(|d| !d.is_empty()),
        }
    }

    fn table_context(operation: &str, table: &TableRef) -> ErrorContext {
        ErrorContext::new()
            .with_operation(operation)
            .with_table(&table.project_id, &table.dataset_id, &table.table_id)
    }
}

#[async_trait]
impl RemoteStore for BigQueryStore {
    async fn get_table_schema(&self, table: &TableRef) -> Result<Option<Vec<Field>>> {
        let result = self
            .client
            .table()
            .get(&table.project_id, &table.dataset_id, &table.table_id, None)
            .await;

        match result {
            Ok(remote) => {
                let fields = remote
                    .schema
                    .fields
                    .unwrap_or_default()
                    .iter()
                    .map(Self::field_from_api)
                    .collect();
                Ok(Some(fields))
            }
            Err(e) => match parse_bq_error(e, Self::table_context("get_table_schema", table)) {
                BigQueryError::TableNotFound { .. } => Ok(None),
                other => Err(SchemaSyncError::BigQuery(other)),
            },
        }
    }

    async fn create_table(&self, table: &TableRef, fields: &[Field]) -> Result<()> {
        let field_schemas = fields
            .iter()
            .map(Self::build_field_schema)
            .collect::<Result<Vec<_>>>()?;

        let new_table = Table::new(
            &table.project_id,
            &table.dataset_id,
            &table.table_id,
            TableSchema { fields: Some(field_schemas) },
        );

        self.client
            .table()
            .create(new_table)
            .await
            .map_err(|e| {
                SchemaSyncError::BigQuery(parse_bq_error(e, Self::table_context("create_table", table)))
            })?;

        info!("Created table {}", table);
        Ok(())
    }

    async fn insert_row(&self, table: &TableRef, row: Row) -> Result<()> {
        let mut request = TableDataInsertAllRequest::new();
        request
            .add_row(Some(uuid::Uuid::new_v4().to_string()), row)
            .map_err(|e| {
                SchemaSyncError::BigQuery(parse_bq_error(e, Self::table_context("insert_row", table)))
            })?;

        let response = self
            .client
            .tabledata()
            .insert_all(&table.project_id, &table.dataset_id, &table.table_id, request)
            .await
            .map_err(|e| {
                SchemaSyncError::BigQuery(parse_bq_error(e, Self::table_context("insert_row", table)))
            })?;

        if let Some(errors) = response.insert_errors.filter(|errs| !errs.is_empty()) {
            return Err(SchemaSyncError::Store(format!(
                "insert into {} rejected: {:?}",
                table, errors
            )));
        }

        Ok(())
    }

    async fn query(&self, query: &RowQuery) -> Result<Vec<Row>> {
        let sql = query.to_sql();
        debug!("Query: {}", sql);

        let ctx = Self::table_context("query", &query.table).with_sql(&sql);
        let response = self
            .client
            .job()
            .query(&self.project_id, QueryRequest::new(&sql))
            .await
            .map_err(|e| SchemaSyncError::BigQuery(parse_bq_error(e, ctx.clone())))?;

        if !response.job_complete.unwrap_or(false) {
            return Err(SchemaSyncError::BigQuery(BigQueryError::Unknown {
                code: Some("INCOMPLETE".to_string()),
                message: format!("query did not complete: {sql}"),
            }));
        }

        let mut result_set = ResultSet::new_from_query_response(response);
        let columns = result_set.column_names();
        let mut rows = Vec::new();

        while result_set.next_row() {
            let mut row = Row::new();
            for (idx, column) in columns.iter().enumerate() {
                let value = result_set
                    .get_json_value(idx)
                    .map_err(|e| SchemaSyncError::BigQuery(parse_bq_error(e, ctx.clone())))?;
                row.insert(column.clone(), value.unwrap_or(serde_json::Value::Null));
            }
            rows.push(row);
        }

        Ok(rows)
    }
}
