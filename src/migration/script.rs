use std::fs;
use std::path::Path;
use crate::diff::SchemaDiff;
use crate::error::{Result, SchemaSyncError};
use crate::store::TableRef;

/// Renders a diff as one `ALTER TABLE` line per field. The output is a
/// review aid, not guaranteed to be executable SQL.
pub fn render_migration_script(table: &TableRef, diff: &SchemaDiff) -> String {
    let target = table.dataset_qualified();
    let mut lines = Vec::with_capacity(diff.change_count());

    for field in &diff.added {
        lines.push(format!(
            "ALTER TABLE {target} ADD COLUMN {} {}...",
            field.name,
            field.type_name()
        ));
    }

    for field in &diff.removed {
        lines.push(format!("ALTER TABLE {target} DROP COLUMN {}...", field.name));
    }

    for change in &diff.modified {
        lines.push(format!(
            "ALTER TABLE {target} ALTER COLUMN {} {}...",
            change.name,
            change.local.type_name()
        ));
    }

    let mut script = lines.join("\n");
    if !script.is_empty() {
        script.push('\n');
    }
    script
}

pub fn write_migration_script(path: &Path, table: &TableRef, diff: &SchemaDiff) -> Result<()> {
    fs::write(path, render_migration_script(table, diff))
        .map_err(|e| SchemaSyncError::MigrationScript(format!("{}: {}", path.display(), e)))
}
