//! The per-invocation context. A [`SchemaSync`] is built once from the
//! loaded config and a store, then every command runs as a method on it.

use std::path::Path;
use tracing::{debug, info};
use crate::config::SyncConfig;
use crate::diff::SchemaDiff;
use crate::error::{BigQueryError, Result, SchemaSyncError};
use crate::migration::{write_migration_script, SchemaVersion, VersionStore};
use crate::schema::{Schema, SchemaValidator};
use crate::store::{RemoteStore, TableRef};

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyReport {
    pub diff: SchemaDiff,
    pub dry_run: bool,
}

pub struct SchemaSync<S: RemoteStore> {
    table: TableRef,
    schema: Schema,
    store: S,
    validator: SchemaValidator,
    dry_run: bool,
}

impl<S: RemoteStore> SchemaSync<S> {
    pub fn new(table: TableRef, schema: Schema, store: S) -> Self {
        Self {
            table,
            schema,
            store,
            validator: SchemaValidator::new(),
            dry_run: false,
        }
    }

    pub fn from_config(config: &SyncConfig, store: S) -> Self {
        Self::new(config.table_ref(), config.schema.clone(), store)
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_validator(mut self, validator: SchemaValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// The active schema: the declared one, or a restored version after
    /// [`SchemaSync::apply_version`].
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn versions(&self) -> VersionStore<'_, S> {
        VersionStore::new(&self.store, &self.table)
    }

    pub fn validate(&self) -> Result<()> {
        self.validator.validate(&self.schema)
    }

    /// Diffs the live table against the active schema. A missing table is
    /// an error.
    pub async fn compare(&self) -> Result<SchemaDiff> {
        let remote = self
            .store
            .get_table_schema(&self.table)
            .await?
            .ok_or_else(|| {
                SchemaSyncError::BigQuery(BigQueryError::TableNotFound {
                    project: self.table.project_id.clone(),
                    dataset: self.table.dataset_id.clone(),
                    table: self.table.table_id.clone(),
                })
            })?;

        let diff = SchemaDiff::between(&remote, &self.schema.fields);
        debug!("Compared {} with local schema: {}", self.table, diff);
        Ok(diff)
    }

    /// Validates, then reports the differences. No DDL is issued against
    /// the table in either mode.
    pub async fn apply(&self) -> Result<ApplyReport> {
        self.validate()?;
        let diff = self.compare().await?;

        if self.dry_run {
            info!("Dry run: {} change(s) would be applied to {}", diff.change_count(), self.table);
        } else {
            info!("Applied {} change(s) to {}", diff.change_count(), self.table);
        }

        Ok(ApplyReport {
            diff,
            dry_run: self.dry_run,
        })
    }

    pub async fn generate_migration_script(&self, output: &Path) -> Result<SchemaDiff> {
        let diff = self.compare().await?;
        write_migration_script(output, &self.table, &diff)?;
        info!("Migration script with {} statement(s) written to {}", diff.change_count(), output.display());
        Ok(diff)
    }

    pub async fn save_version(&self, description: &str) -> Result<SchemaVersion> {
        self.validate()?;
        self.versions().append(&self.schema, description).await
    }

    pub async fn list_versions(&self) -> Result<Vec<SchemaVersion>> {
        self.versions().list().await
    }

    /// Restores a stored version as the active schema. On any error the
    /// active schema is left as it was.
    pub async fn apply_version(&mut self, version: u32) -> Result<&Schema> {
        let stored = self.versions().get(version).await?;
        self.validator.validate(&stored.schema)?;

        self.schema = stored.schema;
        info!("Schema version {} applied successfully.", version);
        Ok(&self.schema)
    }
}
