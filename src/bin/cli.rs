use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bq_schema_sync::{BigQueryStore, ConfigLoader, SchemaSync, SyncConfig, VersionTableRow};
use bq_schema_sync::{format_schema_diff, init_config};
use bq_schema_sync::error::{BigQueryError, Result, SchemaSyncError};
use tabled::{Table, settings::Style};

#[derive(Parser)]
#[command(name = "bq-schema-sync")]
#[command(about = "Keep a declared BigQuery table schema in sync with the live table")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read config.<environment>.yaml instead of the given config file
    #[arg(short, long, env = "ENVIRONMENT", global = true)]
    environment: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a template configuration file
    Init {
        /// Where to write the template
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Compare the declared schema with the live table
    Compare {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,

        /// Dry run (compare never modifies the table)
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply the declared schema to the live table
    Apply {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,

        /// Dry run - only show what would change
        #[arg(long)]
        dry_run: bool,
    },

    /// Write the differences as ALTER TABLE statements
    GenerateScript {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,

        /// Path to the output SQL file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check the declared schema against the naming and type rules
    Validate {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Save the declared schema as a new version
    SaveVersion {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,

        /// Description of the schema change
        #[arg(short, long)]
        description: String,
    },

    /// List all saved schema versions
    ListVersions {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,

        /// Output format: table, yaml, json
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Restore a saved schema version
    ApplyVersion {
        /// Path to the config file
        #[arg(short, long)]
        config: PathBuf,

        /// Version number to apply
        #[arg(long)]
        version: u32,

        /// Write the restored schema back into the config file
        #[arg(long)]
        write: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Yaml,
    Json,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bq_schema_sync=debug,info")
    } else {
        EnvFilter::new("bq_schema_sync=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: &SchemaSyncError) {
    match err {
        SchemaSyncError::BigQuery(bq) => print_bq_error(bq),
        SchemaSyncError::VersionNotFound(version) => {
            eprintln!("\x1b[31m✗ Version {} not found.\x1b[0m", version);
            eprintln!("  Run list-versions to see the saved versions.");
        }
        _ => {
            eprintln!("\x1b[31m✗ Error:\x1b[0m {}", err);
            if !err.is_user_error() {
                eprintln!("  Run with --verbose for details.");
            }
        }
    }
}

fn print_bq_error(err: &BigQueryError) {
    eprintln!("\n\x1b[31m✗ BigQuery Error [{}]\x1b[0m", err.error_code());
    eprintln!("  {}", err);
    eprintln!("\n\x1b[33mSuggestion:\x1b[0m");
    for line in err.suggestion().lines() {
        eprintln!("  {}", line);
    }
    eprintln!();
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        println!("No command specified. Use --help for usage.");
        return Ok(());
    };

    let loader = ConfigLoader::with_environment(cli.environment);

    match command {
        Commands::Init { output, force } => {
            init_config(&output, force)?;
            println!("✓ Template written to {}", output.display());
        }

        Commands::Compare { config, dry_run } => {
            let sync = connect(&loader, &config, dry_run).await?;
            cmd_compare(&sync).await?;
        }

        Commands::Apply { config, dry_run } => {
            let sync = connect(&loader, &config, dry_run).await?;
            cmd_apply(&sync).await?;
        }

        Commands::GenerateScript { config, output } => {
            let sync = connect(&loader, &config, false).await?;
            let diff = sync.generate_migration_script(&output).await?;
            println!("✓ Migration script generated at {} ({} statements)", output.display(), diff.change_count());
        }

        Commands::Validate { config } => {
            let sync_config = loader.load(&config)?;
            cmd_validate(&sync_config)?;
        }

        Commands::SaveVersion { config, description } => {
            let sync = connect(&loader, &config, false).await?;
            let saved = sync.save_version(&description).await?;
            println!("✓ Schema version {} saved successfully.", saved.version);
        }

        Commands::ListVersions { config, format } => {
            let sync = connect(&loader, &config, false).await?;
            cmd_list_versions(&sync, format).await?;
        }

        Commands::ApplyVersion { config, version, write } => {
            let sync_config = loader.load(&config)?;
            let store = open_store(&sync_config).await?;
            let mut sync = SchemaSync::from_config(&sync_config, store);
            cmd_apply_version(&loader, &config, sync_config, &mut sync, version, write).await?;
        }
    }

    Ok(())
}

async fn open_store(config: &SyncConfig) -> Result<BigQueryStore> {
    BigQueryStore::new(&config.project_id, config.service_account_key_path.as_deref()).await
}

async fn connect(loader: &ConfigLoader, config_path: &Path, dry_run: bool) -> Result<SchemaSync<BigQueryStore>> {
    let config = loader.load(config_path)?;
    let store = open_store(&config).await?;
    Ok(SchemaSync::from_config(&config, store).with_dry_run(dry_run))
}

async fn cmd_compare(sync: &SchemaSync<BigQueryStore>) -> Result<()> {
    info!("Comparing local schema with {}", sync.table());
    let diff = sync.compare().await?;

    if sync.is_dry_run() {
        println!("Dry run mode: compare never modifies the table.");
    }
    println!("Schema Differences: {}", diff);
    println!("{}", format_schema_diff(&diff));
    Ok(())
}

async fn cmd_apply(sync: &SchemaSync<BigQueryStore>) -> Result<()> {
    let report = sync.apply().await?;

    if report.dry_run {
        println!("Dry run mode: The following changes would be applied:");
        println!("  Added fields: {:?}", report.diff.added_names());
        println!("  Removed fields: {:?}", report.diff.removed_names());
        println!("  Modified fields: {:?}", report.diff.modified_names());
        println!("Dry run mode: No changes applied.");
    } else {
        println!("Changes applied: {}", report.diff);
        println!("✓ Schema changes applied successfully.");
    }
    Ok(())
}

fn cmd_validate(config: &SyncConfig) -> Result<()> {
    info!("Validating schema for {}", config.table_ref());
    bq_schema_sync::SchemaValidator::new().validate(&config.schema)?;

    println!("✓ Schema validated successfully ({} fields)", config.schema.len());
    Ok(())
}

async fn cmd_list_versions(sync: &SchemaSync<BigQueryStore>, format: OutputFormat) -> Result<()> {
    let versions = sync.list_versions().await?;

    match format {
        OutputFormat::Table => {
            if versions.is_empty() {
                println!("No schema versions saved for {}", sync.table());
                return Ok(());
            }
            let rows: Vec<VersionTableRow> = versions.iter().map(VersionTableRow::from).collect();
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&versions)?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&versions)?);
        }
    }
    Ok(())
}

async fn cmd_apply_version(
    loader: &ConfigLoader,
    config_path: &Path,
    mut config: SyncConfig,
    sync: &mut SchemaSync<BigQueryStore>,
    version: u32,
    write: bool,
) -> Result<()> {
    let schema = sync.apply_version(version).await?.clone();

    println!("✓ Schema version {} applied successfully.", version);
    for field in &schema.fields {
        println!("  {:<30} {:<10} {}", field.name, field.type_name(), field.mode.as_str());
    }

    if write {
        config.schema = schema;
        let written = loader.save(&config, config_path)?;
        println!("\nConfiguration updated: {}", written.display());
    }
    Ok(())
}
