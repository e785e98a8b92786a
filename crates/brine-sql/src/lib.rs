//! Brine SQL - database adapters for Brine
//!
//! Provides a unified SQL interface over SQLite, PostgreSQL and MySQL/MariaDB.
//! The backend is chosen from the connection URI scheme.
//!
//! # Usage
//!
//! ```no_run
//! # async fn run() -> brine_sql::SqlResult<()> {
//! use brine_sql::{ConnectOptions, ConnectionUri};
//!
//! let uri = ConnectionUri::parse("sqlite::memory:")?;
//! let db = brine_sql::connect(&uri, &ConnectOptions::default()).await?;
//! db.batch_execute("CREATE TABLE t (k TEXT PRIMARY KEY)").await?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod mysql;
pub mod postgres;
pub mod query;
pub mod sqlite;
pub mod transaction;
pub mod uri;

mod error;
mod options;
mod value;

use std::sync::Arc;

pub use adapter::{QueryResult, SharedAdapter, SqlAdapter, SqlRow, Statement};
pub use error::{SqlError, SqlResult};
pub use options::ConnectOptions;
pub use query::{ParamStyle, QueryBuilder};
pub use transaction::IsolationLevel;
pub use uri::{Backend, ConnectionUri, ServerOptions};
pub use value::SqlValue;

/// Open an adapter for `uri`
pub async fn connect(uri: &ConnectionUri, options: &ConnectOptions) -> SqlResult<SharedAdapter> {
    let adapter: SharedAdapter = match uri {
        ConnectionUri::Sqlite(target) => {
            Arc::new(sqlite::SqliteAdapter::open(target, options).await?)
        }
        ConnectionUri::Postgres(address) => {
            Arc::new(postgres::PostgresAdapter::connect(address, options).await?)
        }
        ConnectionUri::MySql(address) => {
            Arc::new(mysql::MySqlAdapter::connect(address, options).await?)
        }
    };

    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_selects_backend_from_uri() {
        let uri = ConnectionUri::parse("sqlite::memory:").unwrap();
        let db = connect(&uri, &ConnectOptions::default()).await.unwrap();

        assert_eq!(db.backend(), Backend::Sqlite);
        db.ping().await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_unreachable_server_is_connection_error() {
        let uri = ConnectionUri::postgres(
            ServerOptions::new("nobody", "nothing", "brine")
                .host("127.0.0.1")
                .port(1),
        );
        let options = ConnectOptions {
            connect_timeout: Some(std::time::Duration::from_secs(2)),
            ..ConnectOptions::default()
        };

        let err = connect(&uri, &options).await.err().unwrap();
        assert!(matches!(err, SqlError::Connection(_)), "got {:?}", err);
    }
}
