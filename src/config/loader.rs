use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use crate::error::{Result, SchemaSyncError};
use crate::schema::{BqType, Field, Schema};
use super::parser::{parse_config, SyncConfig};

const ENVIRONMENT_SUFFIXES: &[&str] = &["develop", "main"];

/// Loads and writes config files, optionally redirecting to an
/// environment-specific variant (`config.yaml` -> `config.<env>.yaml`).
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    environment: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(environment: Option<String>) -> Self {
        Self {
            environment: environment.filter(|e| !e.is_empty()),
        }
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// The file actually read for `path`. A trailing `.develop` or `.main`
    /// in the stem is replaced by the configured environment.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        let Some(env) = &self.environment else {
            return path.to_path_buf();
        };

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let base = match stem.rsplit_once('.') {
            Some((base, suffix)) if ENVIRONMENT_SUFFIXES.contains(&suffix) => base.to_string(),
            _ => stem,
        };

        let file_name = match path.extension() {
            Some(ext) => format!("{}.{}.{}", base, env, ext.to_string_lossy()),
            None => format!("{}.{}", base, env),
        };

        path.with_file_name(file_name)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<SyncConfig> {
        let resolved = self.resolve_path(path);
        debug!("Loading configuration from {}", resolved.display());

        let content = fs::read_to_string(&resolved).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SchemaSyncError::ConfigNotFound(resolved.display().to_string()),
            _ => SchemaSyncError::Io(e),
        })?;

        parse_config(&content)
    }

    /// Rewrites the config file at the resolved location.
    pub fn save(&self, config: &SyncConfig, path: impl AsRef<Path>) -> Result<PathBuf> {
        let resolved = self.resolve_path(path);
        fs::write(&resolved, config.to_yaml()?)?;
        info!("Configuration written to {}", resolved.display());
        Ok(resolved)
    }
}

pub fn template_config() -> SyncConfig {
    SyncConfig {
        project_id: "your-gcp-project-id".to_string(),
        dataset_id: "your-dataset-id".to_string(),
        table_id: "your-table-id".to_string(),
        schema: Schema::new()
            .add_field(
                Field::new("id", BqType::String)
                    .required()
                    .with_description("Unique identifier"),
            )
            .add_field(
                Field::new("created_at", BqType::Timestamp)
                    .with_description("Record creation timestamp"),
            ),
        service_account_key_path: None,
    }
}

/// Writes the starter config. An existing file is kept unless `force`.
pub fn init_config(path: impl AsRef<Path>, force: bool) -> Result<()> {
    let path = path.as_ref();
    if path.exists() && !force {
        return Err(SchemaSyncError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    fs::write(path, template_config().to_yaml()?)?;
    info!("Template {} created successfully.", path.display());
    Ok(())
}
