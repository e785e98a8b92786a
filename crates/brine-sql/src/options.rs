//! Connection options shared by every adapter

use std::time::Duration;

/// Tuning knobs applied when an adapter is created
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound of pooled connections (PostgreSQL, MySQL)
    pub max_connections: usize,
    /// How long to wait for a connection to be established or handed out
    pub connect_timeout: Option<Duration>,
    /// How long an idle pooled connection may live before being recycled
    pub idle_timeout: Option<Duration>,
    /// Switch file-backed SQLite databases to WAL with `synchronous=NORMAL`
    pub sqlite_wal: bool,
    pub application_name: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout: Some(Duration::from_secs(10)),
            idle_timeout: Some(Duration::from_secs(30)),
            sqlite_wal: true,
            application_name: Some("brine".into()),
        }
    }
}
