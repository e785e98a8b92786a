//! MySQL / MariaDB adapter implementation
//!
//! Provides a MySQL backend using a sqlx connection pool.

mod types;

use crate::adapter::{QueryResult, SqlAdapter, SqlRow, Statement};
use crate::error::{SqlError, SqlResult};
use crate::options::ConnectOptions;
use crate::transaction::{IsolationLevel, isolation_level_sql};
use crate::uri::{Backend, ServerAddress};
use crate::value::SqlValue;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row};

/// MySQL database adapter with connection pooling
pub struct MySqlAdapter {
    pool: MySqlPool,
}

impl MySqlAdapter {
    /// Create a new MySQL adapter for a server address
    pub async fn connect(address: &ServerAddress, options: &ConnectOptions) -> SqlResult<Self> {
        let mut connect = MySqlConnectOptions::new()
            .host(&address.host)
            .port(address.port)
            .database(&address.database);
        if !address.user.is_empty() {
            connect = connect.username(&address.user);
        }
        if !address.password.is_empty() {
            connect = connect.password(&address.password);
        }

        let mut pool_options = MySqlPoolOptions::new()
            .max_connections(options.max_connections as u32)
            .idle_timeout(options.idle_timeout);
        if let Some(timeout) = options.connect_timeout {
            pool_options = pool_options.acquire_timeout(timeout);
        }

        let pool = pool_options
            .connect_with(connect)
            .await
            .map_err(|e| SqlError::Connection(e.to_string()))?;

        tracing::debug!(
            host = %address.host,
            port = address.port,
            database = %address.database,
            "connected to mysql"
        );

        Ok(Self { pool })
    }

    fn row_to_sql_row(row: &MySqlRow) -> SqlRow {
        let columns: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
        let values: Vec<SqlValue> = (0..columns.len())
            .map(|i| types::from_mysql_value(row, i))
            .collect();
        SqlRow::new(columns, values)
    }

    async fn execute_on(
        conn: &mut MySqlConnection,
        sql: &str,
        params: &[SqlValue],
    ) -> SqlResult<u64> {
        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, value| types::bind_value(query, value));

        let result = query.execute(conn).await.map_err(SqlError::mysql)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SqlAdapter for MySqlAdapter {
    fn backend(&self) -> Backend {
        Backend::MySql
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> SqlResult<QueryResult> {
        let query = params
            .iter()
            .fold(sqlx::query(sql), |query, value| types::bind_value(query, value));

        let rows = query.fetch_all(&self.pool).await.map_err(SqlError::mysql)?;

        Ok(QueryResult::new(rows.iter().map(Self::row_to_sql_row).collect()))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> SqlResult<u64> {
        let mut conn = self.pool.acquire().await?;
        Self::execute_on(&mut conn, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> SqlResult<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(SqlError::mysql)?;
        Ok(())
    }

    async fn execute_atomic(
        &self,
        statements: Vec<Statement>,
        isolation: Option<IsolationLevel>,
    ) -> SqlResult<u64> {
        let mut conn = self.pool.acquire().await?;

        // Applies to the next transaction on this session only
        let isolation_sql = format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            isolation_level_sql(isolation.unwrap_or_default())
        );
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&isolation_sql))
            .await
            .map_err(|e| SqlError::Transaction(e.to_string()))?;

        // An uncommitted sqlx transaction rolls back when dropped, before the
        // connection is reused
        let mut tx = sqlx::Connection::begin(&mut *conn)
            .await
            .map_err(|e| SqlError::Transaction(e.to_string()))?;

        let mut affected = 0;
        for (index, statement) in statements.iter().enumerate() {
            match Self::execute_on(&mut tx, &statement.sql, &statement.params).await {
                Ok(rows) => affected += rows,
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!(error = %rollback_err, "mysql rollback failed");
                    }
                    return Err(SqlError::in_batch(index, err));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| SqlError::Transaction(e.to_string()))?;

        Ok(affected)
    }

    async fn close(&self) -> SqlResult<()> {
        self.pool.close().await;
        Ok(())
    }
}
