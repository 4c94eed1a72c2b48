mod script;
mod version_store;

pub use script::{render_migration_script, write_migration_script};
pub use version_store::{SchemaVersion, VersionStore, VersionTableRow, METADATA_TABLE};
