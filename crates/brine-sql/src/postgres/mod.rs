//! PostgreSQL adapter implementation
//!
//! Provides a PostgreSQL backend using tokio-postgres with connection pooling.

mod types;

use crate::adapter::{QueryResult, SqlAdapter, SqlRow, Statement};
use crate::error::{SqlError, SqlResult};
use crate::options::ConnectOptions;
use crate::transaction::IsolationLevel;
use crate::uri::{Backend, ServerAddress};
use crate::value::SqlValue;
use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::{NoTls, Row as PgRow};

/// PostgreSQL connection options
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub max_connections: usize,
    pub idle_timeout: Option<Duration>,
    pub connection_timeout: Option<Duration>,
    pub application_name: Option<String>,
}

impl PostgresOptions {
    pub fn new(address: &ServerAddress, options: &ConnectOptions) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        Self {
            host: address.host.clone(),
            port: address.port,
            database: address.database.clone(),
            user: non_empty(&address.user),
            password: non_empty(&address.password),
            max_connections: options.max_connections,
            idle_timeout: options.idle_timeout,
            connection_timeout: options.connect_timeout,
            application_name: options.application_name.clone(),
        }
    }
}

/// PostgreSQL database adapter with connection pooling
pub struct PostgresAdapter {
    pool: Pool,
    options: PostgresOptions,
    reaper: Option<JoinHandle<()>>,
}

impl PostgresAdapter {
    /// Create a new PostgreSQL adapter for a server address
    pub async fn connect(address: &ServerAddress, options: &ConnectOptions) -> SqlResult<Self> {
        Self::connect_with_options(PostgresOptions::new(address, options)).await
    }

    /// Create a new PostgreSQL adapter with options
    pub async fn connect_with_options(options: PostgresOptions) -> SqlResult<Self> {
        let mut cfg = Config::new();
        cfg.host = Some(options.host.clone());
        cfg.port = Some(options.port);
        cfg.dbname = Some(options.database.clone());
        cfg.user = options.user.clone();
        cfg.password = options.password.clone();
        cfg.application_name = options.application_name.clone();

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: options.max_connections,
            timeouts: deadpool_postgres::Timeouts {
                wait: options.connection_timeout,
                create: options.connection_timeout,
                recycle: options.connection_timeout,
            },
            queue_mode: deadpool::managed::QueueMode::Fifo,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| SqlError::Pool(e.to_string()))?;

        // Test connection
        let _client = pool
            .get()
            .await
            .map_err(|e| SqlError::Connection(e.to_string()))?;

        tracing::debug!(
            host = %options.host,
            port = options.port,
            database = %options.database,
            "connected to postgres"
        );

        let reaper = options
            .idle_timeout
            .map(|idle| spawn_idle_reaper(pool.clone(), idle));

        Ok(Self {
            pool,
            options,
            reaper,
        })
    }

    pub fn options(&self) -> &PostgresOptions {
        &self.options
    }

    /// Convert a tokio_postgres Row to SqlRow
    fn row_to_sql_row(row: &PgRow) -> SqlRow {
        let columns: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
        let values: Vec<SqlValue> = (0..columns.len())
            .map(|i| types::from_pg_value(row, i))
            .collect();
        SqlRow::new(columns, values)
    }

    async fn execute_on(
        client: &deadpool_postgres::Object,
        sql: &str,
        params: &[SqlValue],
    ) -> SqlResult<u64> {
        let pg_params = types::to_pg_params(params);
        let param_refs = types::params_as_refs(&pg_params);

        client
            .execute(sql, &param_refs)
            .await
            .map_err(SqlError::postgres)
    }
}

#[async_trait]
impl SqlAdapter for PostgresAdapter {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> SqlResult<QueryResult> {
        let client = self.pool.get().await?;
        let pg_params = types::to_pg_params(params);
        let param_refs = types::params_as_refs(&pg_params);

        let rows = client
            .query(sql, &param_refs)
            .await
            .map_err(SqlError::postgres)?;

        let sql_rows: Vec<SqlRow> = rows.iter().map(Self::row_to_sql_row).collect();
        Ok(QueryResult::new(sql_rows))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> SqlResult<u64> {
        let client = self.pool.get().await?;
        Self::execute_on(&client, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> SqlResult<()> {
        let client = self.pool.get().await?;
        client.batch_execute(sql).await.map_err(SqlError::postgres)
    }

    async fn execute_atomic(
        &self,
        statements: Vec<Statement>,
        isolation: Option<IsolationLevel>,
    ) -> SqlResult<u64> {
        let mut client = self.pool.get().await?;

        // Dropping the transaction before commit rolls it back, so an
        // abandoned batch never returns an open transaction to the pool
        let tx = client
            .build_transaction()
            .isolation_level(pg_isolation(isolation.unwrap_or_default()))
            .start()
            .await
            .map_err(|e| SqlError::Transaction(SqlError::postgres(e).to_string()))?;

        let mut affected = 0;
        for (index, statement) in statements.iter().enumerate() {
            let pg_params = types::to_pg_params(&statement.params);
            let param_refs = types::params_as_refs(&pg_params);

            match tx.execute(statement.sql.as_str(), &param_refs).await {
                Ok(rows) => affected += rows,
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!(error = %rollback_err, "postgres rollback failed");
                    }
                    return Err(SqlError::in_batch(index, SqlError::postgres(err)));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| SqlError::Transaction(SqlError::postgres(e).to_string()))?;

        Ok(affected)
    }

    async fn close(&self) -> SqlResult<()> {
        if let Some(reaper) = &self.reaper {
            reaper.abort();
        }
        self.pool.close();
        Ok(())
    }
}

impl Drop for PostgresAdapter {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
    }
}

fn pg_isolation(level: IsolationLevel) -> tokio_postgres::IsolationLevel {
    match level {
        IsolationLevel::ReadCommitted => tokio_postgres::IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead => tokio_postgres::IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable => tokio_postgres::IsolationLevel::Serializable,
    }
}

/// deadpool has no idle lifetime of its own; drop connections unused for `idle`
fn spawn_idle_reaper(pool: Pool, idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(idle.max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            if pool.is_closed() {
                break;
            }
            pool.retain(|_, metrics| metrics.last_used() < idle);
        }
    })
}
