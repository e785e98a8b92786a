//! SQL error types

use thiserror::Error;

pub type SqlResult<T> = Result<T, SqlError>;

#[derive(Debug, Error)]
pub enum SqlError {
    #[error("SQLite error: {message}")]
    Sqlite { message: String, code: Option<i32> },

    #[error("PostgreSQL error: {message}")]
    Postgres {
        message: String,
        code: Option<String>,
        detail: Option<String>,
        hint: Option<String>,
    },

    #[error("MySQL error: {message}")]
    MySql {
        message: String,
        code: Option<String>,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    /// A statement inside an atomic batch failed; the batch was rolled back.
    #[error("statement {index} of batch failed: {source}")]
    BatchStatement {
        index: usize,
        #[source]
        source: Box<SqlError>,
    },

    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl SqlError {
    pub fn sqlite(err: rusqlite::Error) -> Self {
        SqlError::Sqlite {
            message: err.to_string(),
            code: err.sqlite_error_code().map(|c| c as i32),
        }
    }

    pub fn postgres(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            SqlError::Postgres {
                message: db_err.message().to_string(),
                code: Some(db_err.code().code().to_string()),
                detail: db_err.detail().map(|s| s.to_string()),
                hint: db_err.hint().map(|s| s.to_string()),
            }
        } else {
            SqlError::Postgres {
                message: err.to_string(),
                code: None,
                detail: None,
                hint: None,
            }
        }
    }

    pub fn mysql(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => SqlError::MySql {
                message: db_err.message().to_string(),
                code: db_err.code().map(|c| c.into_owned()),
            },
            err @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
                SqlError::Pool(err.to_string())
            }
            err @ (sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Configuration(_)) => {
                SqlError::Connection(err.to_string())
            }
            other => SqlError::MySql {
                message: other.to_string(),
                code: None,
            },
        }
    }

    /// Wrap an error raised by the statement at `index` of an atomic batch.
    pub fn in_batch(index: usize, err: SqlError) -> Self {
        SqlError::BatchStatement {
            index,
            source: Box::new(err),
        }
    }

    /// Backend error code, when the backend reported one
    pub fn code(&self) -> Option<String> {
        match self {
            SqlError::Sqlite { code, .. } => code.map(|c| c.to_string()),
            SqlError::Postgres { code, .. } | SqlError::MySql { code, .. } => code.clone(),
            SqlError::BatchStatement { source, .. } => source.code(),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SqlError {
    fn from(err: rusqlite::Error) -> Self {
        SqlError::sqlite(err)
    }
}

impl From<tokio_postgres::Error> for SqlError {
    fn from(err: tokio_postgres::Error) -> Self {
        SqlError::postgres(err)
    }
}

impl From<deadpool_postgres::PoolError> for SqlError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        SqlError::Pool(err.to_string())
    }
}

impl From<sqlx::Error> for SqlError {
    fn from(err: sqlx::Error) -> Self {
        SqlError::mysql(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_error_keeps_backend_message() {
        let err = SqlError::in_batch(
            2,
            SqlError::Sqlite {
                message: "UNIQUE constraint failed".into(),
                code: Some(19),
            },
        );

        let text = err.to_string();
        assert!(text.contains("statement 2"));
        assert!(text.contains("UNIQUE constraint failed"));
        assert_eq!(err.code().as_deref(), Some("19"));
    }
}
