use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use async_trait::async_trait;
use crate::error::{BigQueryError, Result, SchemaSyncError};
use crate::schema::Field;
use super::{RemoteStore, Row, RowQuery, TableRef};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    fields: Vec<Field>,
    rows: Vec<Row>,
}

/// In-process stand-in for BigQuery. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<HashMap<TableRef, MemoryTable>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an existing table with the given columns. A poisoned lock
    /// is recovered so the table is always registered.
    pub fn with_table(self, table: &TableRef, fields: Vec<Field>) -> Self {
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.clone(), MemoryTable { fields, rows: Vec::new() });
        self
    }

    pub fn has_table(&self, table: &TableRef) -> bool {
        self.lock().map(|t| t.contains_key(table)).unwrap_or(false)
    }

    pub fn rows(&self, table: &TableRef) -> Vec<Row> {
        self.lock()
            .ok()
            .and_then(|t| t.get(table).map(|m| m.rows.clone()))
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TableRef, MemoryTable>>> {
        self.tables
            .lock()
            .map_err(|_| SchemaSyncError::Store("memory store lock poisoned".to_string()))
    }
}

fn not_found(table: &TableRef) -> SchemaSyncError {
    SchemaSyncError::BigQuery(BigQueryError::TableNotFound {
        project: table.project_id.clone(),
        dataset: table.dataset_id.clone(),
        table: table.table_id.clone(),
    })
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_table_schema(&self, table: &TableRef) -> Result<Option<Vec<Field>>> {
        Ok(self.lock()?.get(table).map(|t| t.fields.clone()))
    }

    async fn create_table(&self, table: &TableRef, fields: &[Field]) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.contains_key(table) {
            return Err(SchemaSyncError::BigQuery(BigQueryError::AlreadyExists {
                resource: table.to_string(),
            }));
        }
        tables.insert(table.clone(), MemoryTable { fields: fields.to_vec(), rows: Vec::new() });
        Ok(())
    }

    async fn insert_row(&self, table: &TableRef, row: Row) -> Result<()> {
        let mut tables = self.lock()?;
        let target = tables.get_mut(table).ok_or_else(|| not_found(table))?;

        if let Some(unknown) = row.keys().find(|k| !target.fields.iter().any(|f| &f.name == *k)) {
            return Err(SchemaSyncError::Store(format!(
                "no such field '{unknown}' in {table}"
            )));
        }

        target.rows.push(row);
        Ok(())
    }

    async fn query(&self, query: &RowQuery) -> Result<Vec<Row>> {
        let tables = self.lock()?;
        let target = tables.get(&query.table).ok_or_else(|| not_found(&query.table))?;
        Ok(query.evaluate(&target.rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BqType;
    use serde_json::json;

    fn events() -> TableRef {
        TableRef::new("proj", "ds", "events")
    }

    #[test]
    fn test_with_table_survives_poisoned_lock() {
        let store = MemoryStore::new();
        let shared = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.tables.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(store.tables.is_poisoned());

        let store = store.with_table(&events(), vec![Field::new("id", BqType::String)]);
        let registered = store.tables.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(registered.contains_key(&events()));
    }

    #[tokio::test]
    async fn test_missing_table_has_no_schema() {
        let store = MemoryStore::new();
        assert!(store.get_table_schema(&events()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_then_insert() {
        let store = MemoryStore::new();
        store
            .create_table(&events(), &[Field::new("id", BqType::String)])
            .await
            .unwrap();

        let mut row = Row::new();
        row.insert("id".into(), json!("abc"));
        store.insert_row(&events(), row).await.unwrap();

        assert_eq!(store.rows(&events()).len(), 1);
        assert!(store.has_table(&events()));
    }

    #[tokio::test]
    async fn test_create_existing_table_fails() {
        let store = MemoryStore::new().with_table(&events(), vec![]);
        let err = store.create_table(&events(), &[]).await.unwrap_err();
        assert!(matches!(err, SchemaSyncError::BigQuery(BigQueryError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_insert_unknown_column_fails() {
        let store = MemoryStore::new().with_table(&events(), vec![Field::new("id", BqType::String)]);
        let mut row = Row::new();
        row.insert("other".into(), json!(1));
        assert!(store.insert_row(&events(), row).await.is_err());
    }

    #[tokio::test]
    async fn test_query_missing_table_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .query(&RowQuery::select(events(), &["id"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaSyncError::BigQuery(ref e) if e.is_table_not_found()));
    }
}
