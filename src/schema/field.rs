use serde::{Deserialize, Serialize};
use std::fmt;

/// A BigQuery column type. Names the tool does not know are kept verbatim
/// so validation can report them instead of the YAML parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum BqType {
    String,
    Bytes,
    Integer,
    Int64,
    Float,
    Float64,
    Numeric,
    Bignumeric,
    Boolean,
    Bool,
    Date,
    Datetime,
    Time,
    Timestamp,
    Geography,
    Json,
    Record,
    Other(String),
}

impl BqType {
    pub fn as_str(&self) -> &str {
        match self {
            BqType::String => "STRING",
            BqType::Bytes => "BYTES",
            BqType::Integer => "INTEGER",
            BqType::Int64 => "INT64",
            BqType::Float => "FLOAT",
            BqType::Float64 => "FLOAT64",
            BqType::Numeric => "NUMERIC",
            BqType::Bignumeric => "BIGNUMERIC",
            BqType::Boolean => "BOOLEAN",
            BqType::Bool => "BOOL",
            BqType::Date => "DATE",
            BqType::Datetime => "DATETIME",
            BqType::Time => "TIME",
            BqType::Timestamp => "TIMESTAMP",
            BqType::Geography => "GEOGRAPHY",
            BqType::Json => "JSON",
            BqType::Record => "RECORD",
            BqType::Other(name) => name,
        }
    }
}

impl From<&str> for BqType {
    fn from(s: &str) -> Self {
        match s {
            "STRING" => BqType::String,
            "BYTES" => BqType::Bytes,
            "INTEGER" => BqType::Integer,
            "INT64" => BqType::Int64,
            "FLOAT" => BqType::Float,
            "FLOAT64" => BqType::Float64,
            "NUMERIC" => BqType::Numeric,
            "BIGNUMERIC" => BqType::Bignumeric,
            "BOOLEAN" => BqType::Boolean,
            "BOOL" => BqType::Bool,
            "DATE" => BqType::Date,
            "DATETIME" => BqType::Datetime,
            "TIME" => BqType::Time,
            "TIMESTAMP" => BqType::Timestamp,
            "GEOGRAPHY" => BqType::Geography,
            "JSON" => BqType::Json,
            "RECORD" | "STRUCT" => BqType::Record,
            other => BqType::Other(other.to_string()),
        }
    }
}

impl From<String> for BqType {
    fn from(s: String) -> Self {
        BqType::from(s.as_str())
    }
}

impl From<BqType> for String {
    fn from(t: BqType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for BqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldMode::Nullable => "NULLABLE",
            FieldMode::Required => "REQUIRED",
            FieldMode::Repeated => "REPEATED",
        }
    }

    /// Parses the mode string reported by the BigQuery API; absent means NULLABLE.
    pub fn from_api(mode: Option<&str>) -> Self {
        match mode.map(|m| m.to_ascii_uppercase()).as_deref() {
            Some("REQUIRED") => FieldMode::Required,
            Some("REPEATED") => FieldMode::Repeated,
            _ => FieldMode::Nullable,
        }
    }
}

/// A column definition. `name` and `field_type` may be missing when read
/// from a hand-written config; the validator rejects such fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Field {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<BqType>,
    #[serde(default)]
    pub mode: FieldMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: BqType) -> Self {
        Self {
            name: name.into(),
            field_type: Some(field_type),
            mode: FieldMode::default(),
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.mode = FieldMode::Required;
        self
    }

    pub fn repeated(mut self) -> Self {
        self.mode = FieldMode::Repeated;
        self
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Type name for display, `?` when the field has none.
    pub fn type_name(&self) -> &str {
        self.field_type.as_ref().map(|t| t.as_str()).unwrap_or("?")
    }

    /// Whether two definitions of the same column differ in type, mode or description.
    pub fn differs_from(&self, other: &Field) -> bool {
        self.field_type != other.field_type
            || self.mode != other.mode
            || self.description() != other.description()
    }

    /// The description, with an empty string read as none. BigQuery does
    /// not keep empty descriptions.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bq_type_parses_known_and_unknown_names() {
        assert_eq!(BqType::from("TIMESTAMP"), BqType::Timestamp);
        assert_eq!(BqType::from("STRUCT"), BqType::Record);
        assert_eq!(BqType::from("VARCHAR"), BqType::Other("VARCHAR".into()));
        assert_eq!(BqType::Other("VARCHAR".into()).to_string(), "VARCHAR");
    }

    #[test]
    fn test_field_deserializes_without_mode() {
        let field: Field = serde_yaml::from_str("name: id\ntype: STRING\n").unwrap();
        assert_eq!(field.field_type, Some(BqType::String));
        assert_eq!(field.mode, FieldMode::Nullable);
        assert!(field.description.is_none());
    }

    #[test]
    fn test_field_deserializes_without_type() {
        let field: Field = serde_yaml::from_str("name: id\n").unwrap();
        assert!(field.field_type.is_none());
        assert_eq!(field.type_name(), "?");
    }

    #[test]
    fn test_field_mode_from_api() {
        assert_eq!(FieldMode::from_api(None), FieldMode::Nullable);
        assert_eq!(FieldMode::from_api(Some("required")), FieldMode::Required);
        assert_eq!(FieldMode::from_api(Some("REPEATED")), FieldMode::Repeated);
    }

    #[test]
    fn test_differs_from_checks_description() {
        let a = Field::new("id", BqType::String).required();
        let b = a.clone().with_description("Unique identifier");
        assert!(a.differs_from(&b));
        assert!(!a.differs_from(&a.clone()));
    }

    #[test]
    fn test_empty_description_is_no_description() {
        let bare = Field::new("id", BqType::String);
        let empty = bare.clone().with_description("");
        assert_eq!(empty.description(), None);
        assert!(!bare.differs_from(&empty));
        assert!(!empty.differs_from(&bare));
    }
}
