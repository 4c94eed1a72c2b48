use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use crate::error::{Result, SchemaSyncError};
use crate::schema::{Field, Schema};
use crate::store::TableRef;

/// The config file as written by hand: every key optional so that a
/// missing one is reported by name instead of as a YAML error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub dataset_id: Option<String>,
    #[serde(default)]
    pub table_id: Option<String>,
    #[serde(default)]
    pub schema: Option<RawSchemaSection>,
    #[serde(default)]
    pub service_account_key_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSchemaSection {
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account_key_path: Option<PathBuf>,
}

impl SyncConfig {
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.project_id, &self.dataset_id, &self.table_id)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    value.ok_or_else(|| {
        SchemaSyncError::Config(format!("Missing required configuration field: {key}"))
    })
}

impl TryFrom<RawConfig> for SyncConfig {
    type Error = SchemaSyncError;

    fn try_from(raw: RawConfig) -> Result<Self> {
        let project_id = required(raw.project_id, "project_id")?;
        let dataset_id = required(raw.dataset_id, "dataset_id")?;
        let table_id = required(raw.table_id, "table_id")?;

        let section = raw.schema.ok_or_else(|| {
            SchemaSyncError::Config("Missing required configuration field: schema".to_string())
        })?;
        let fields = section.fields.ok_or_else(|| {
            SchemaSyncError::Config("Missing 'fields' in schema configuration".to_string())
        })?;

        Ok(SyncConfig {
            project_id,
            dataset_id,
            table_id,
            schema: Schema::from_fields(fields),
            service_account_key_path: raw.service_account_key_path,
        })
    }
}

/// Parses and checks config file contents.
pub fn parse_config(content: &str) -> Result<SyncConfig> {
    if content.trim().is_empty() {
        return Err(SchemaSyncError::Config("configuration file is empty".to_string()));
    }
    let raw: RawConfig = serde_yaml::from_str(content)?;
    SyncConfig::try_from(raw)
}
