//! Configuration file parsing for brine.toml.

use crate::error::{KvError, KvResult};
use brine_sql::{ConnectOptions, IsolationLevel};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrineConfig {
    /// Connection pool settings (PostgreSQL, MySQL)
    pub pool: PoolConfig,

    /// SQLite settings
    pub sqlite: SqliteConfig,

    /// Run the backend maintenance statement on close
    pub optimize_on_close: bool,

    /// Isolation level of batch write transactions
    pub batch_isolation: IsolationLevel,
}

impl Default for BrineConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            sqlite: SqliteConfig::default(),
            optimize_on_close: true,
            batch_isolation: IsolationLevel::default(),
        }
    }
}

/// Pool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_connections: usize,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            connect_timeout_secs: 10,
            idle_timeout_secs: 30,
        }
    }
}

/// SQLite configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Enable WAL journaling for file databases
    pub wal: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self { wal: true }
    }
}

impl BrineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> KvResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| KvError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content).map_err(|e| match e {
            KvError::Config(msg) => {
                KvError::Config(format!("Failed to parse {}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> KvResult<Self> {
        let config: BrineConfig =
            toml::from_str(content).map_err(|e| KvError::Config(e.to_string()))?;

        if config.pool.max_connections == 0 {
            return Err(KvError::Config(
                "pool.max_connections must be at least 1".into(),
            ));
        }

        Ok(config)
    }

    /// Adapter options derived from this configuration
    pub fn connect_options(&self) -> ConnectOptions {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));

        ConnectOptions {
            max_connections: self.pool.max_connections,
            connect_timeout: secs(self.pool.connect_timeout_secs),
            idle_timeout: secs(self.pool.idle_timeout_secs),
            sqlite_wal: self.sqlite.wal,
            ..ConnectOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BrineConfig::from_toml_str("").unwrap();

        assert!(config.optimize_on_close);
        assert!(config.sqlite.wal);
        assert_eq!(config.pool.max_connections, 10);
        assert_eq!(config.batch_isolation, IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_partial_config() {
        let config = BrineConfig::from_toml_str(
            r#"
            optimize_on_close = false
            batch_isolation = "serializable"

            [pool]
            max_connections = 4
            idle_timeout_secs = 0

            [sqlite]
            wal = false
            "#,
        )
        .unwrap();

        assert!(!config.optimize_on_close);
        assert_eq!(config.batch_isolation, IsolationLevel::Serializable);

        let options = config.connect_options();
        assert_eq!(options.max_connections, 4);
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(10)));
        assert_eq!(options.idle_timeout, None);
        assert!(!options.sqlite_wal);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(matches!(
            BrineConfig::from_toml_str("[pool]\nmax_connections = 0"),
            Err(KvError::Config(_))
        ));
        assert!(matches!(
            BrineConfig::from_toml_str("batch_isolation = \"chaos\""),
            Err(KvError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brine.toml");
        std::fs::write(&path, "[pool]\nmax_connections = 2\n").unwrap();

        let config = BrineConfig::load(&path).unwrap();
        assert_eq!(config.pool.max_connections, 2);

        assert!(matches!(
            BrineConfig::load(dir.path().join("missing.toml")),
            Err(KvError::Config(_))
        ));
    }
}
