//! The remote tabular store the tool talks to.
//!
//! Production code uses [`BigQueryStore`]; tests and offline callers can use
//! [`MemoryStore`], which evaluates [`RowQuery`] values directly.

mod bigquery;
mod memory;
mod query;

use std::fmt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::schema::Field;

pub use bigquery::BigQueryStore;
pub use memory::MemoryStore;
pub use query::{Predicate, RowQuery, SortOrder};

/// One result or insert row, keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        }
    }

    /// Another table in the same dataset.
    pub fn sibling(&self, table_id: impl Into<String>) -> Self {
        Self::new(&self.project_id, &self.dataset_id, table_id)
    }

    /// `dataset.table`, as used in generated migration scripts.
    pub fn dataset_qualified(&self) -> String {
        format!("{}.{}", self.dataset_id, self.table_id)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Column definitions of `table`, or `None` when the table does not exist.
    async fn get_table_schema(&self, table: &TableRef) -> Result<Option<Vec<Field>>>;

    async fn create_table(&self, table: &TableRef, fields: &[Field]) -> Result<()>;

    async fn insert_row(&self, table: &TableRef, row: Row) -> Result<()>;

    async fn query(&self, query: &RowQuery) -> Result<Vec<Row>>;
}
