use bq_schema_sync::error::SchemaSyncError;
use bq_schema_sync::schema::{BqType, Field, FieldMode, Schema, SchemaValidator};

fn valid_schema() -> Schema {
    Schema::new()
        .add_field(Field::new("id", BqType::String).required().with_description("Unique identifier"))
        .add_field(Field::new("created_at", BqType::Timestamp))
        .add_field(Field::new("score", BqType::Float))
        .add_field(Field::new("active", BqType::Boolean))
        .add_field(Field::new("attempts", BqType::Integer).repeated())
}

#[test]
fn test_field_creation() {
    let field = Field::new("user_id", BqType::String);
    assert_eq!(field.name, "user_id");
    assert_eq!(field.field_type, Some(BqType::String));
    assert_eq!(field.mode, FieldMode::Nullable);
}

#[test]
fn test_field_modes() {
    assert_eq!(Field::new("id", BqType::String).required().mode, FieldMode::Required);
    assert_eq!(Field::new("tags", BqType::String).repeated().mode, FieldMode::Repeated);
    assert_eq!(
        Field::new("tags", BqType::String).with_mode(FieldMode::Nullable).mode,
        FieldMode::Nullable
    );
}

#[test]
fn test_schema_lookup() {
    let schema = valid_schema();
    assert_eq!(schema.len(), 5);
    assert!(schema.has_field("created_at"));
    assert!(!schema.has_field("updated_at"));
    assert_eq!(schema.get_field("score").unwrap().field_type, Some(BqType::Float));
    assert_eq!(schema.field_names()[0], "id");
}

#[test]
fn test_schema_json_blob_round_trip() {
    let schema = valid_schema();
    let blob = schema.to_json().unwrap();
    assert!(blob.starts_with("{\"fields\":["));
    assert_eq!(Schema::from_json(&blob).unwrap(), schema);
}

#[test]
fn test_schema_from_yaml_keeps_order() {
    let yaml = r#"
fields:
  - name: id
    type: STRING
  - name: zeta
    type: INTEGER
  - name: alpha
    type: BOOLEAN
"#;
    let schema: Schema = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(schema.field_names(), vec!["id", "zeta", "alpha"]);
}

#[test]
fn test_all_allowed_types_validate() {
    assert!(SchemaValidator::new().validate(&valid_schema()).is_ok());
}

#[test]
fn test_missing_id_fails_validation() {
    let schema = Schema::new().add_field(Field::new("created_at", BqType::Timestamp));
    let err = SchemaValidator::new().validate(&schema).unwrap_err();
    match err {
        SchemaSyncError::Validation(msg) => assert!(msg.contains("Missing required fields")),
        other => panic!("Expected validation error, got {:?}", other),
    }
}

#[test]
fn test_mixed_case_name_fails_naming_convention() {
    let schema = Schema::new()
        .add_field(Field::new("id", BqType::String))
        .add_field(Field::new("Created_At", BqType::Timestamp));
    let err = SchemaValidator::new().validate(&schema).unwrap_err();
    assert!(err.to_string().contains("'Created_At' does not follow the naming convention"));
}

#[test]
fn test_names_with_dashes_fail_naming_convention() {
    let schema = Schema::new()
        .add_field(Field::new("id", BqType::String))
        .add_field(Field::new("created-at", BqType::Timestamp));
    assert!(SchemaValidator::new().validate(&schema).is_err());
}

#[test]
fn test_unknown_type_from_yaml_fails_validation() {
    let schema: Schema = serde_yaml::from_str("fields:\n  - name: id\n    type: VARCHAR\n").unwrap();
    let err = SchemaValidator::new().validate(&schema).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Schema validation failed: Field 'id' has an invalid type 'VARCHAR'"
    );
}

#[test]
fn test_standard_sql_type_names_are_not_allowed() {
    let schema = Schema::new().add_field(Field::new("id", BqType::Int64));
    assert!(SchemaValidator::new().validate(&schema).is_err());
}

#[test]
fn test_field_without_name_fails_validation() {
    let schema: Schema = serde_yaml::from_str("fields:\n  - type: STRING\n").unwrap();
    let err = SchemaValidator::new().validate(&schema).unwrap_err();
    assert!(err.to_string().contains("must have a 'name' and 'type'"));
}
