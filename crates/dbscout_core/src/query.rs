use crate::Value;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for executing a SQL query.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    /// The SQL statement to execute.
    pub sql: String,

    /// Maximum time to wait for query completion.
    pub statement_timeout: Option<Duration>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }
}

/// A single row of query results.
pub type Row = Vec<Value>;

/// Metadata for a result column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name as returned by the database.
    pub name: String,

    /// Database-specific type name (e.g., "nvarchar", "int").
    pub type_name: String,

    /// Whether the column allows NULL values.
    pub nullable: bool,
}

/// Result of executing a SQL query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,

    /// Row data, where each row contains values matching `columns` order.
    pub rows: Vec<Row>,

    /// Wall-clock time taken to execute the query.
    pub execution_time: Duration,
}

impl QueryResult {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Row>, execution_time: Duration) -> Self {
        Self {
            columns,
            rows,
            execution_time,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Duration::ZERO)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Values of the first column, in row order.
    pub fn first_column(&self) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(|row| row.first())
    }
}
