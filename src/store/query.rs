use std::cmp::Ordering;
use serde_json::Value;
use super::{Row, TableRef};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    All,
    Eq { column: String, value: Value },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A select over a single table: columns, an optional equality filter,
/// ordering and limit.
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub table: TableRef,
    pub columns: Vec<String>,
    pub predicate: Predicate,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl RowQuery {
    pub fn select(table: TableRef, columns: &[&str]) -> Self {
        Self {
            table,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            predicate: Predicate::All,
            order_by: None,
            limit: None,
        }
    }

    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicate = Predicate::Eq {
            column: column.into(),
            value: value.into(),
        };
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM `{}`", self.columns.join(", "), self.table);

        if let Predicate::Eq { column, value } = &self.predicate {
            sql.push_str(&format!(" WHERE {} = {}", column, sql_literal(value)));
        }

        if let Some((column, order)) = &self.order_by {
            let direction = match order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            sql.push_str(&format!(" ORDER BY {column} {direction}"));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        sql
    }

    pub fn matches(&self, row: &Row) -> bool {
        match &self.predicate {
            Predicate::All => true,
            Predicate::Eq { column, value } => row
                .get(column)
                .map(|cell| compare_values(cell, value) == Ordering::Equal)
                .unwrap_or(false),
        }
    }

    /// Applies the filter, ordering, limit and projection to in-memory rows.
    pub fn evaluate<'a>(&self, rows: impl IntoIterator<Item = &'a Row>) -> Vec<Row> {
        let mut selected: Vec<&Row> = rows.into_iter().filter(|r| self.matches(r)).collect();

        if let Some((column, order)) = &self.order_by {
            selected.sort_by(|a, b| {
                let ord = match (a.get(column), b.get(column)) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            });
        }

        let limit = self.limit.unwrap_or(usize::MAX);

        selected
            .into_iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect()
            })
            .collect()
    }
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        other => quote(&other.to_string()),
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Numbers compare numerically, even when one side arrived as a string.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
