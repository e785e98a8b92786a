//! SQL adapter trait for unified database access
//!
//! This module defines the core abstraction for database adapters,
//! allowing SQLite, PostgreSQL and MySQL to be used interchangeably.

use crate::error::SqlResult;
use crate::transaction::IsolationLevel;
use crate::uri::Backend;
use crate::value::SqlValue;
use async_trait::async_trait;
use std::sync::Arc;

/// A row returned from a SQL query
#[derive(Debug, Clone)]
pub struct SqlRow {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Consume the row, yielding its values in column order
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

/// Query result from a database operation
#[derive(Debug)]
pub struct QueryResult {
    pub rows: Vec<SqlRow>,
}

impl QueryResult {
    pub fn new(rows: Vec<SqlRow>) -> Self {
        Self { rows }
    }

    /// First column of the first row, if any
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.get_by_index(0))
    }
}

/// A parameterized statement, ready to run on any adapter speaking its dialect
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A statement without bound parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Core trait for SQL database adapters
#[async_trait]
pub trait SqlAdapter: Send + Sync {
    /// Backend this adapter talks to
    fn backend(&self) -> Backend;

    /// Execute a query and return results
    async fn query(&self, sql: &str, params: &[SqlValue]) -> SqlResult<QueryResult>;

    /// Execute a statement and return affected rows
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> SqlResult<u64>;

    /// Run one or more unparameterized statements (DDL, pragmas, maintenance)
    async fn batch_execute(&self, sql: &str) -> SqlResult<()>;

    /// Run every statement inside a single transaction.
    ///
    /// Either all statements are committed or none are. A failing statement
    /// is reported as [`SqlError::BatchStatement`](crate::SqlError::BatchStatement)
    /// carrying its index, after the transaction was rolled back.
    async fn execute_atomic(
        &self,
        statements: Vec<Statement>,
        isolation: Option<IsolationLevel>,
    ) -> SqlResult<u64>;

    /// Check that the backend is still reachable
    async fn ping(&self) -> SqlResult<()> {
        self.query("SELECT 1", &[]).await.map(|_| ())
    }

    /// Close all connections
    async fn close(&self) -> SqlResult<()>;
}

/// Shared adapter instance
pub type SharedAdapter = Arc<dyn SqlAdapter>;
