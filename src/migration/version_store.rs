use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;
use tracing::{debug, info};
use crate::error::{Result, SchemaSyncError};
use crate::schema::{BqType, Field, Schema};
use crate::store::{RemoteStore, Row, RowQuery, SortOrder, TableRef};

pub const METADATA_TABLE: &str = "schema_versions";

const VERSION: &str = "version";
const TIMESTAMP: &str = "timestamp";
const DESCRIPTION: &str = "description";
const SCHEMA: &str = "schema";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaVersion {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub schema: Schema,
}

impl SchemaVersion {
    fn to_row(&self) -> Result<Row> {
        let mut row = Row::new();
        row.insert(VERSION.into(), Value::from(self.version));
        row.insert(TIMESTAMP.into(), Value::from(self.timestamp.to_rfc3339()));
        row.insert(DESCRIPTION.into(), Value::from(self.description.clone()));
        row.insert(SCHEMA.into(), Value::from(self.schema.to_json()?));
        Ok(row)
    }

    fn from_row(row: &Row) -> Result<Self> {
        let version = version_cell(row)?;
        let timestamp = timestamp_cell(row, TIMESTAMP)?;
        let description = string_cell(row, DESCRIPTION)?.to_string();
        let schema = Schema::from_json(string_cell(row, SCHEMA)?)?;

        Ok(Self { version, timestamp, description, schema })
    }
}

#[derive(Debug, Clone, Tabled)]
pub struct VersionTableRow {
    #[tabled(rename = "Version")]
    pub version: u32,
    #[tabled(rename = "Timestamp")]
    pub timestamp: String,
    #[tabled(rename = "Description")]
    pub description: String,
    #[tabled(rename = "Fields")]
    pub fields: usize,
}

impl From<&SchemaVersion> for VersionTableRow {
    fn from(v: &SchemaVersion) -> Self {
        VersionTableRow {
            version: v.version,
            timestamp: v.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            description: v.description.clone(),
            fields: v.schema.len(),
        }
    }
}

fn missing(column: &str) -> SchemaSyncError {
    SchemaSyncError::Store(format!("version row has no '{column}' value"))
}

fn string_cell<'a>(row: &'a Row, column: &str) -> Result<&'a str> {
    row.get(column).and_then(Value::as_str).ok_or_else(|| missing(column))
}

// BigQuery returns INT64 cells as JSON strings.
fn version_cell(row: &Row) -> Result<u32> {
    let raw = match row.get(VERSION) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| missing(VERSION))?;

    u32::try_from(raw)
        .map_err(|_| SchemaSyncError::Store(format!("version {raw} is out of range")))
}

// BigQuery returns TIMESTAMP cells as epoch seconds ("1.7181216E9"); rows
// written by this tool carry RFC 3339 strings.
fn timestamp_cell(row: &Row, column: &str) -> Result<DateTime<Utc>> {
    let value = row.get(column).ok_or_else(|| missing(column))?;

    let epoch_seconds = match value {
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Ok(ts.with_timezone(&Utc));
            }
            s.parse::<f64>().ok()
        }
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| SchemaSyncError::Store(format!("unreadable timestamp {value}")))?;

    let micros = (epoch_seconds * 1_000_000.0).round() as i64;
    Utc.timestamp_micros(micros)
        .single()
        .ok_or_else(|| SchemaSyncError::Store(format!("timestamp {epoch_seconds} out of range")))
}

/// Append-only log of schema snapshots kept in the `schema_versions` table
/// next to the managed table.
pub struct VersionStore<'a, S: RemoteStore> {
    store: &'a S,
    table: TableRef,
}

impl<'a, S: RemoteStore> VersionStore<'a, S> {
    pub fn new(store: &'a S, managed_table: &TableRef) -> Self {
        Self {
            store,
            table: managed_table.sibling(METADATA_TABLE),
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    pub fn metadata_fields() -> Vec<Field> {
        vec![
            Field::new(VERSION, BqType::Int64).required(),
            Field::new(TIMESTAMP, BqType::Timestamp).required(),
            Field::new(DESCRIPTION, BqType::String).required(),
            Field::new(SCHEMA, BqType::String).required(),
        ]
    }

    /// Creates the metadata table when it does not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        if self.store.get_table_schema(&self.table).await?.is_none() {
            self.store
                .create_table(&self.table, &Self::metadata_fields())
                .await?;
            info!("Created metadata table {}", self.table);
        }
        Ok(())
    }

    /// Max stored version + 1, or 1 for an empty log. Two writers racing
    /// here can pick the same number.
    pub async fn next_version(&self) -> Result<u32> {
        let query = RowQuery::select(self.table.clone(), &[VERSION])
            .order_by(VERSION, SortOrder::Descending)
            .limit(1);

        let rows = self.store.query(&query).await?;
        match rows.first() {
            Some(row) => {
                let latest = version_cell(row)?;
                latest.checked_add(1).ok_or_else(|| {
                    SchemaSyncError::Store(format!("version {latest} is the last one available"))
                })
            }
            None => Ok(1),
        }
    }

    /// Appends a snapshot of `schema`. The caller validates it first.
    pub async fn append(&self, schema: &Schema, description: &str) -> Result<SchemaVersion> {
        self.ensure_table().await?;

        let entry = SchemaVersion {
            version: self.next_version().await?,
            timestamp: Utc::now(),
            description: description.to_string(),
            schema: schema.clone(),
        };

        self.store.insert_row(&self.table, entry.to_row()?).await?;
        info!("Schema version {} saved to {}", entry.version, self.table);

        Ok(entry)
    }

    pub async fn list(&self) -> Result<Vec<SchemaVersion>> {
        self.ensure_table().await?;

        let query = RowQuery::select(self.table.clone(), &[VERSION, TIMESTAMP, DESCRIPTION, SCHEMA])
            .order_by(VERSION, SortOrder::Ascending);

        let rows = self.store.query(&query).await?;
        debug!("Read {} version rows from {}", rows.len(), self.table);

        rows.iter().map(SchemaVersion::from_row).collect()
    }

    pub async fn get(&self, version: u32) -> Result<SchemaVersion> {
        self.ensure_table().await?;

        let query = RowQuery::select(self.table.clone(), &[VERSION, TIMESTAMP, DESCRIPTION, SCHEMA])
            .filter_eq(VERSION, version)
            .limit(1);

        let rows = self.store.query(&query).await?;
        match rows.first() {
            Some(row) => SchemaVersion::from_row(row),
            None => Err(SchemaSyncError::VersionNotFound(version)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_version_cell_accepts_strings_and_numbers() {
        assert_eq!(version_cell(&row(json!({ "version": "12" }))).unwrap(), 12);
        assert_eq!(version_cell(&row(json!({ "version": 3 }))).unwrap(), 3);
        assert!(version_cell(&row(json!({ "version": "x" }))).is_err());
        assert!(version_cell(&row(json!({}))).is_err());
    }

    #[test]
    fn test_timestamp_cell_accepts_epoch_seconds() {
        let ts = timestamp_cell(&row(json!({ "timestamp": "1.7181216E9" })), TIMESTAMP).unwrap();
        assert_eq!(ts.timestamp(), 1_718_121_600);
    }

    #[test]
    fn test_timestamp_cell_accepts_rfc3339() {
        let ts = timestamp_cell(&row(json!({ "timestamp": "2024-06-11T16:00:00+00:00" })), TIMESTAMP)
            .unwrap();
        assert_eq!(ts.timestamp(), 1_718_121_600);
    }

    #[test]
    fn test_row_round_trip() {
        let entry = SchemaVersion {
            version: 4,
            timestamp: Utc.timestamp_opt(1_718_121_600, 0).unwrap(),
            description: "add created_at".into(),
            schema: Schema::new().add_field(Field::new("id", BqType::String).required()),
        };
        let decoded = SchemaVersion::from_row(&entry.to_row().unwrap()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_table_row_formats_timestamp() {
        let entry = SchemaVersion {
            version: 1,
            timestamp: Utc.timestamp_opt(1_718_121_600, 0).unwrap(),
            description: "initial".into(),
            schema: Schema::default(),
        };
        let table_row = VersionTableRow::from(&entry);
        assert_eq!(table_row.timestamp, "2024-06-11 16:00:00 UTC");
        assert_eq!(table_row.fields, 0);
    }

    #[tokio::test]
    async fn test_next_version_refuses_to_wrap() {
        let managed = TableRef::new("proj", "ds", "events");
        let store = MemoryStore::new()
            .with_table(&managed.sibling(METADATA_TABLE), VersionStore::<MemoryStore>::metadata_fields());
        store
            .insert_row(&managed.sibling(METADATA_TABLE), row(json!({ "version": u32::MAX })))
            .await
            .unwrap();

        let versions = VersionStore::new(&store, &managed);
        let err = versions.next_version().await.unwrap_err();
        assert!(matches!(err, SchemaSyncError::Store(_)));
    }

    #[tokio::test]
    async fn test_next_version_follows_latest() {
        let managed = TableRef::new("proj", "ds", "events");
        let store = MemoryStore::new()
            .with_table(&managed.sibling(METADATA_TABLE), VersionStore::<MemoryStore>::metadata_fields());
        for version in [2, 7, 5] {
            store
                .insert_row(&managed.sibling(METADATA_TABLE), row(json!({ "version": version })))
                .await
                .unwrap();
        }

        assert_eq!(VersionStore::new(&store, &managed).next_version().await.unwrap(), 8);
    }
}
