use std::collections::{HashMap, HashSet};
use std::fmt;
use colored::Colorize;
use serde::Serialize;
use crate::schema::Field;

/// A field present on both sides whose type, mode or description differ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub name: String,
    pub remote: Field,
    pub local: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaDiff {
    pub added: Vec<Field>,
    pub removed: Vec<Field>,
    pub modified: Vec<FieldChange>,
}

impl SchemaDiff {
    /// Compares the live table (`remote`) with the declared schema (`local`).
    ///
    /// Added and modified follow the local field order, removed follows the
    /// remote order. Each name appears at most once.
    pub fn between(remote: &[Field], local: &[Field]) -> Self {
        let remote_by_name: HashMap<&str, &Field> =
            remote.iter().map(|f| (f.name.as_str(), f)).collect();
        let local_by_name: HashMap<&str, &Field> =
            local.iter().map(|f| (f.name.as_str(), f)).collect();

        let mut diff = SchemaDiff::default();
        let mut seen = HashSet::new();

        // A repeated local name is reported once, at its first position,
        // using its last definition.
        for name in local.iter().map(|f| f.name.as_str()) {
            if !seen.insert(name) {
                continue;
            }
            let field = local_by_name[name];
            match remote_by_name.get(name) {
                None => diff.added.push(field.clone()),
                Some(current) if current.differs_from(field) => {
                    diff.modified.push(FieldChange {
                        name: field.name.clone(),
                        remote: (*current).clone(),
                        local: field.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        diff.removed = remote
            .iter()
            .filter(|f| !local_by_name.contains_key(f.name.as_str()))
            .cloned()
            .collect();

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn added_names(&self) -> Vec<&str> {
        self.added.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn removed_names(&self) -> Vec<&str> {
        self.removed.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn modified_names(&self) -> Vec<&str> {
        self.modified.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added: [{}], removed: [{}], modified: [{}]",
            self.added_names().join(", "),
            self.removed_names().join(", "),
            self.modified_names().join(", ")
        )
    }
}

fn describe(field: &Field) -> String {
    format!("{} {}", field.type_name(), field.mode.as_str())
}

/// Terminal rendering of a diff: `+` added, `-` removed, `~` modified.
pub fn format_schema_diff(diff: &SchemaDiff) -> String {
    if diff.is_empty() {
        return "No schema differences".dimmed().to_string();
    }

    let mut output = String::new();
    output.push_str(&"───────────────────────────────────────\n".dimmed().to_string());

    for field in &diff.added {
        let line = format!("+ {} {}", field.name, describe(field));
        output.push_str(&line.green().to_string());
        output.push('\n');
    }

    for field in &diff.removed {
        let line = format!("- {} {}", field.name, describe(field));
        output.push_str(&line.red().to_string());
        output.push('\n');
    }

    for change in &diff.modified {
        let line = format!(
            "~ {} {} -> {}",
            change.name,
            describe(&change.remote),
            describe(&change.local)
        );
        output.push_str(&line.yellow().to_string());
        output.push('\n');
        if change.remote.description() != change.local.description() {
            let desc = format!(
                "    description: {:?} -> {:?}",
                change.remote.description.as_deref().unwrap_or(""),
                change.local.description.as_deref().unwrap_or("")
            );
            output.push_str(&desc.dimmed().to_string());
            output.push('\n');
        }
    }

    output.push_str(&"───────────────────────────────────────".dimmed().to_string());
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BqType;

    #[test]
    fn test_identical_schemas_have_no_diff() {
        let fields = vec![
            Field::new("id", BqType::String).required(),
            Field::new("created_at", BqType::Timestamp),
        ];
        let diff = SchemaDiff::between(&fields, &fields);
        assert!(diff.is_empty());
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn test_modified_keeps_both_sides() {
        let remote = vec![Field::new("score", BqType::Integer)];
        let local = vec![Field::new("score", BqType::Float)];
        let diff = SchemaDiff::between(&remote, &local);
        assert_eq!(diff.modified_names(), vec!["score"]);
        assert_eq!(diff.modified[0].remote.field_type, Some(BqType::Integer));
        assert_eq!(diff.modified[0].local.field_type, Some(BqType::Float));
    }

    #[test]
    fn test_display_lists_names() {
        let remote = vec![Field::new("id", BqType::String), Field::new("legacy", BqType::String)];
        let local = vec![Field::new("id", BqType::String), Field::new("created_at", BqType::Timestamp)];
        let diff = SchemaDiff::between(&remote, &local);
        assert_eq!(diff.to_string(), "added: [created_at], removed: [legacy], modified: []");
    }

    #[test]
    fn test_format_diff_shows_changes() {
        let remote = vec![Field::new("id", BqType::String), Field::new("legacy", BqType::String)];
        let local = vec![Field::new("id", BqType::Integer), Field::new("created_at", BqType::Timestamp)];
        let formatted = format_schema_diff(&SchemaDiff::between(&remote, &local));
        assert!(formatted.contains("+ created_at TIMESTAMP NULLABLE"));
        assert!(formatted.contains("- legacy STRING NULLABLE"));
        assert!(formatted.contains("~ id STRING NULLABLE -> INTEGER NULLABLE"));
    }
}
