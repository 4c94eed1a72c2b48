use regex::Regex;
use crate::error::{Result, SchemaSyncError};
use super::field::BqType;
use super::table::Schema;

pub const NAMING_CONVENTION: &str = "^[a-z0-9_]+$";

/// Rules a declared schema must satisfy before it is compared, applied or saved.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub required_fields: Vec<String>,
    pub allowed_types: Vec<BqType>,
    pub naming_convention: String,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required_fields: vec!["id".to_string()],
            allowed_types: vec![
                BqType::String,
                BqType::Integer,
                BqType::Float,
                BqType::Boolean,
                BqType::Timestamp,
            ],
            naming_convention: NAMING_CONVENTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    rules: ValidationRules,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: ValidationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Stops at the first violated rule.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        let naming = Regex::new(&self.rules.naming_convention).map_err(|e| {
            SchemaSyncError::Validation(format!("invalid naming convention pattern: {e}"))
        })?;

        let mut missing: Vec<&str> = self.rules.required_fields.iter().map(|s| s.as_str()).collect();

        for field in &schema.fields {
            let field_type = match &field.field_type {
                Some(t) if !field.name.is_empty() => t,
                _ => {
                    return Err(SchemaSyncError::Validation(
                        "Each field must have a 'name' and 'type'".to_string(),
                    ))
                }
            };

            missing.retain(|name| *name != field.name);

            if !self.rules.allowed_types.contains(field_type) {
                return Err(SchemaSyncError::Validation(format!(
                    "Field '{}' has an invalid type '{}'",
                    field.name, field_type
                )));
            }

            if !naming.is_match(&field.name) {
                return Err(SchemaSyncError::Validation(format!(
                    "Field '{}' does not follow the naming convention",
                    field.name
                )));
            }
        }

        if !missing.is_empty() {
            return Err(SchemaSyncError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;

    fn validation_message(schema: &Schema) -> String {
        match SchemaValidator::new().validate(schema) {
            Err(SchemaSyncError::Validation(msg)) => msg,
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_schema() {
        let schema = Schema::new()
            .add_field(Field::new("id", BqType::String).required())
            .add_field(Field::new("created_at", BqType::Timestamp));
        assert!(SchemaValidator::new().validate(&schema).is_ok());
    }

    #[test]
    fn test_missing_id() {
        let schema = Schema::new().add_field(Field::new("created_at", BqType::Timestamp));
        assert_eq!(validation_message(&schema), "Missing required fields: id");
    }

    #[test]
    fn test_uppercase_name_rejected() {
        let schema = Schema::new()
            .add_field(Field::new("id", BqType::String))
            .add_field(Field::new("Created_At", BqType::Timestamp));
        assert_eq!(
            validation_message(&schema),
            "Field 'Created_At' does not follow the naming convention"
        );
    }

    #[test]
    fn test_type_checked_before_name() {
        let schema = Schema::new()
            .add_field(Field::new("id", BqType::String))
            .add_field(Field::new("Payload", BqType::Json));
        assert_eq!(validation_message(&schema), "Field 'Payload' has an invalid type 'JSON'");
    }

    #[test]
    fn test_missing_type() {
        let mut field = Field::new("id", BqType::String);
        field.field_type = None;
        let schema = Schema::from_fields(vec![field]);
        assert_eq!(validation_message(&schema), "Each field must have a 'name' and 'type'");
    }

    #[test]
    fn test_fails_fast_on_first_violation() {
        let schema = Schema::new()
            .add_field(Field::new("Bad", BqType::String))
            .add_field(Field::new("worse", BqType::Other("VARCHAR".into())));
        assert_eq!(
            validation_message(&schema),
            "Field 'Bad' does not follow the naming convention"
        );
    }

    #[test]
    fn test_custom_rules() {
        let rules = ValidationRules {
            required_fields: vec!["id".into(), "tenant".into()],
            ..ValidationRules::default()
        };
        let schema = Schema::new().add_field(Field::new("id", BqType::String));
        let err = SchemaValidator::with_rules(rules).validate(&schema).unwrap_err();
        assert_eq!(err.to_string(), "Schema validation failed: Missing required fields: tenant");
    }
}
