//! SQLite adapter implementation
//!
//! Provides a SQLite backend using rusqlite with async support via spawn_blocking.
//! A single connection is shared behind a mutex, so statements are serialized.

mod types;

use crate::adapter::{QueryResult, SqlAdapter, SqlRow, Statement};
use crate::error::{SqlError, SqlResult};
use crate::options::ConnectOptions;
use crate::transaction::IsolationLevel;
use crate::uri::{Backend, OpenMode, SqliteTarget};
use crate::value::SqlValue;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, TransactionBehavior, params_from_iter};
use std::sync::Arc;

/// SQLite database connection
pub struct SqliteAdapter {
    conn: Arc<Mutex<Option<Connection>>>,
    target: SqliteTarget,
}

impl SqliteAdapter {
    /// Open a SQLite database on the blocking pool
    pub async fn open(target: &SqliteTarget, options: &ConnectOptions) -> SqlResult<Self> {
        let owned = target.clone();
        let wal = options.sqlite_wal;

        let conn = tokio::task::spawn_blocking(move || Self::open_sync(&owned, wal))
            .await
            .map_err(|e| SqlError::Connection(format!("Task join error: {}", e)))??;

        tracing::debug!(database = ?target, "opened sqlite database");

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            target: target.clone(),
        })
    }

    fn open_sync(target: &SqliteTarget, wal: bool) -> SqlResult<Connection> {
        let conn = match target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File { path, mode } => {
                let access = match mode {
                    OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
                    OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
                    OpenMode::ReadWriteCreate => {
                        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
                    }
                };
                Connection::open_with_flags(path, access | OpenFlags::SQLITE_OPEN_FULL_MUTEX)
            }
        }
        .map_err(|e| SqlError::Connection(e.to_string()))?;

        // WAL only makes sense for writable files
        let writable_file = matches!(
            target,
            SqliteTarget::File { mode, .. } if *mode != OpenMode::ReadOnly
        );
        if wal && writable_file {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
                .map_err(SqlError::sqlite)?;
        }

        Ok(conn)
    }

    pub fn target(&self) -> &SqliteTarget {
        &self.target
    }

    /// Run `f` on the connection from the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> SqlResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> SqlResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            let conn = guard
                .as_mut()
                .ok_or_else(|| SqlError::Connection("SQLite connection is closed".into()))?;
            f(conn)
        })
        .await
        .map_err(|e| SqlError::Query(format!("Task join error: {}", e)))?
    }

    /// Execute a query and return results (sync, internal)
    fn query_sync(conn: &Connection, sql: &str, params: &[SqlValue]) -> SqlResult<QueryResult> {
        let mut stmt = conn.prepare(sql).map_err(SqlError::sqlite)?;

        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let column_count = column_names.len();

        let rows_result: Result<Vec<SqlRow>, rusqlite::Error> = stmt
            .query(params_from_iter(params.iter().map(types::to_rusqlite_value)))?
            .mapped(|row| {
                let values = (0..column_count)
                    .map(|i| types::from_rusqlite_value(row, i))
                    .collect();
                Ok(SqlRow::new(column_names.clone(), values))
            })
            .collect();

        Ok(QueryResult::new(rows_result.map_err(SqlError::sqlite)?))
    }

    /// Execute a statement (sync, internal)
    fn execute_sync(conn: &Connection, sql: &str, params: &[SqlValue]) -> SqlResult<u64> {
        let rows_affected = conn
            .execute(
                sql,
                params_from_iter(params.iter().map(types::to_rusqlite_value)),
            )
            .map_err(SqlError::sqlite)?;

        Ok(rows_affected as u64)
    }
}

#[async_trait]
impl SqlAdapter for SqliteAdapter {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> SqlResult<QueryResult> {
        let sql = sql.to_string();
        let params = params.to_vec();

        self.with_conn(move |conn| Self::query_sync(conn, &sql, &params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> SqlResult<u64> {
        let sql = sql.to_string();
        let params = params.to_vec();

        self.with_conn(move |conn| Self::execute_sync(conn, &sql, &params))
            .await
    }

    async fn batch_execute(&self, sql: &str) -> SqlResult<()> {
        let sql = sql.to_string();

        self.with_conn(move |conn| conn.execute_batch(&sql).map_err(SqlError::sqlite))
            .await
    }

    async fn execute_atomic(
        &self,
        statements: Vec<Statement>,
        _isolation: Option<IsolationLevel>,
    ) -> SqlResult<u64> {
        // SQLite transactions are serializable; IMMEDIATE takes the write lock up front
        self.with_conn(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| SqlError::Transaction(e.to_string()))?;

            let mut affected = 0;
            for (index, statement) in statements.iter().enumerate() {
                affected += Self::execute_sync(&tx, &statement.sql, &statement.params)
                    .map_err(|e| SqlError::in_batch(index, e))?;
            }

            tx.commit()
                .map_err(|e| SqlError::Transaction(e.to_string()))?;
            Ok(affected)
        })
        .await
    }

    async fn close(&self) -> SqlResult<()> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || match conn.lock().take() {
            Some(conn) => conn.close().map_err(|(_, e)| SqlError::sqlite(e)),
            None => Ok(()),
        })
        .await
        .map_err(|e| SqlError::Query(format!("Task join error: {}", e)))?
    }
}
