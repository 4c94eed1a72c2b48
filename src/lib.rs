pub mod error;
pub mod schema;
pub mod config;
pub mod diff;
pub mod store;
pub mod migration;
pub mod sync;

pub use error::{BigQueryError, SchemaSyncError, Result};
pub use schema::{BqType, Field, FieldMode, Schema, SchemaValidator, ValidationRules};
pub use config::{ConfigLoader, SyncConfig, init_config, template_config};
pub use diff::{FieldChange, SchemaDiff, format_schema_diff};
pub use store::{BigQueryStore, MemoryStore, RemoteStore, Row, RowQuery, TableRef};
pub use migration::{SchemaVersion, VersionStore, VersionTableRow, render_migration_script, write_migration_script};
pub use sync::{ApplyReport, SchemaSync};
