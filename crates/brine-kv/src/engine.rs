//! Key-value engine over the SQL adapters
//!
//! Values are opaque strings; the engine never looks inside them.
//! `keys()` and `values()` return rows in whatever order the backend
//! produces (usually insertion or primary-key order). That order is not
//! guaranteed and differs between backends.

use crate::config::BrineConfig;
use crate::error::{KvError, KvResult};
use crate::manager::{Connection, ConnectionManager, LifecycleState};
use crate::migrator;
use brine_sql::{IsolationLevel, SqlError, SqlValue, Statement};
use std::collections::HashMap;

/// Keys bound per statement, well under every backend's parameter limit
const CHUNK_SIZE: usize = 500;

pub struct KvEngine {
    manager: ConnectionManager,
    batch_isolation: IsolationLevel,
    optimize_on_close: bool,
}

impl KvEngine {
    pub fn new(uri: impl Into<String>, config: &BrineConfig) -> Self {
        Self {
            manager: ConnectionManager::new(uri, config.connect_options()),
            batch_isolation: config.batch_isolation,
            optimize_on_close: config.optimize_on_close,
        }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn state(&self) -> LifecycleState {
        self.manager.state()
    }

    /// Connect and migrate. Safe to call again while connected.
    pub async fn init(&self) -> KvResult<()> {
        let connection = self.manager.connect().await?;
        migrator::migrate(&connection).await?;
        self.manager.mark_migrated();
        Ok(())
    }

    /// Fails with `NotInitialized` unless `init` completed and `close` was not called
    pub fn ensure_ready(&self) -> KvResult<()> {
        self.manager.acquire().map(|_| ())
    }

    pub async fn close(&self) -> KvResult<()> {
        self.manager.close(self.optimize_on_close).await
    }

    pub async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let conn = self.manager.acquire()?;
        let stmt = conn.dialect().select_one(key);

        let result = conn
            .adapter()
            .query(&stmt.sql, &stmt.params)
            .await
            .map_err(KvError::Storage)?;

        result
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_values().into_iter().next())
            .map(into_text)
            .transpose()
    }

    /// Insert or overwrite; returns the value written
    pub async fn set(&self, key: &str, value: String) -> KvResult<String> {
        let conn = self.manager.acquire()?;
        let stmt = conn.dialect().upsert(key, &value);

        run(&conn, &stmt).await?;
        tracing::debug!(key, "set");
        Ok(value)
    }

    /// Upsert every pair in one transaction. Later duplicates of a key win.
    pub async fn set_many(&self, pairs: Vec<(String, String)>) -> KvResult<()> {
        let conn = self.manager.acquire()?;
        if pairs.is_empty() {
            return Ok(());
        }

        let dialect = conn.dialect();
        let statements: Vec<Statement> = pairs
            .iter()
            .map(|(key, value)| dialect.upsert(key, value))
            .collect();

        conn.adapter()
            .execute_atomic(statements, Some(self.batch_isolation))
            .await
            .map_err(KvError::BatchWrite)?;

        tracing::debug!(count = pairs.len(), "set_many");
        Ok(())
    }

    /// One entry per requested key; absent keys map to `None`
    pub async fn get_many(&self, keys: &[String]) -> KvResult<HashMap<String, Option<String>>> {
        let conn = self.manager.acquire()?;
        let mut found: HashMap<String, Option<String>> =
            keys.iter().map(|key| (key.clone(), None)).collect();

        for chunk in keys.chunks(CHUNK_SIZE) {
            let stmt = conn.dialect().select_many(chunk);
            let result = conn
                .adapter()
                .query(&stmt.sql, &stmt.params)
                .await
                .map_err(KvError::Storage)?;

            for row in result.rows {
                let mut values = row.into_values().into_iter();
                let (Some(key), Some(value)) = (values.next(), values.next()) else {
                    continue;
                };
                // Only answer for keys that were asked for, byte for byte
                if let Some(slot) = found.get_mut(&into_text(key)?) {
                    *slot = Some(into_text(value)?);
                }
            }
        }

        Ok(found)
    }

    /// Deleting an absent key is a no-op
    pub async fn delete(&self, key: &str) -> KvResult<()> {
        let conn = self.manager.acquire()?;
        let stmt = conn.dialect().delete_one(key);

        let removed = run(&conn, &stmt).await?;
        tracing::debug!(key, removed, "delete");
        Ok(())
    }

    /// Delete all `keys` in one transaction; absent keys are ignored
    pub async fn delete_many(&self, keys: &[String]) -> KvResult<()> {
        let conn = self.manager.acquire()?;
        if keys.is_empty() {
            return Ok(());
        }

        let statements: Vec<Statement> = keys
            .chunks(CHUNK_SIZE)
            .map(|chunk| conn.dialect().delete_many(chunk))
            .collect();

        let removed = conn
            .adapter()
            .execute_atomic(statements, Some(self.batch_isolation))
            .await
            .map_err(KvError::BatchWrite)?;

        tracing::debug!(requested = keys.len(), removed, "delete_many");
        Ok(())
    }

    pub async fn count(&self) -> KvResult<u64> {
        let conn = self.manager.acquire()?;
        let stmt = conn.dialect().count();

        let result = conn
            .adapter()
            .query(&stmt.sql, &stmt.params)
            .await
            .map_err(KvError::Storage)?;

        result
            .scalar()
            .and_then(SqlValue::as_i64)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| unexpected("COUNT(*) did not return a non-negative integer"))
    }

    pub async fn has(&self, key: &str) -> KvResult<bool> {
        let conn = self.manager.acquire()?;
        let stmt = conn.dialect().exists(key);

        let result = conn
            .adapter()
            .query(&stmt.sql, &stmt.params)
            .await
            .map_err(KvError::Storage)?;

        result
            .scalar()
            .and_then(SqlValue::as_bool)
            .ok_or_else(|| unexpected("EXISTS did not return a boolean"))
    }

    pub async fn keys(&self) -> KvResult<Vec<String>> {
        let conn = self.manager.acquire()?;
        column(&conn, &conn.dialect().list_keys()).await
    }

    pub async fn values(&self) -> KvResult<Vec<String>> {
        let conn = self.manager.acquire()?;
        column(&conn, &conn.dialect().list_values()).await
    }

    /// Remove every row; clearing an empty table is fine
    pub async fn clear(&self) -> KvResult<()> {
        let conn = self.manager.acquire()?;
        let removed = run(&conn, &conn.dialect().delete_all()).await?;

        tracing::debug!(removed, "clear");
        Ok(())
    }
}

async fn run(conn: &Connection, stmt: &Statement) -> KvResult<u64> {
    conn.adapter()
        .execute(&stmt.sql, &stmt.params)
        .await
        .map_err(KvError::Storage)
}

/// First column of every row as text
async fn column(conn: &Connection, stmt: &Statement) -> KvResult<Vec<String>> {
    let result = conn
        .adapter()
        .query(&stmt.sql, &stmt.params)
        .await
        .map_err(KvError::Storage)?;

    result
        .rows
        .into_iter()
        .filter_map(|row| row.into_values().into_iter().next())
        .map(into_text)
        .collect()
}

fn into_text(value: SqlValue) -> KvResult<String> {
    let kind = format!("{:?}", value);
    value
        .into_text()
        .ok_or_else(|| unexpected(&format!("expected text column, got {}", kind)))
}

fn unexpected(message: &str) -> KvError {
    KvError::Storage(SqlError::TypeConversion(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ready() -> KvEngine {
        let engine = KvEngine::new("sqlite::memory:", &BrineConfig::default());
        engine.init().await.unwrap();
        engine
    }

    fn owned(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[tokio::test]
    async fn test_engine_basic() {
        let engine = ready().await;

        assert_eq!(engine.get("missing").await.unwrap(), None);
        assert!(!engine.has("missing").await.unwrap());

        assert_eq!(engine.set("hello", "world".into()).await.unwrap(), "world");
        assert_eq!(engine.get("hello").await.unwrap().as_deref(), Some("world"));
        assert!(engine.has("hello").await.unwrap());
        assert_eq!(engine.count().await.unwrap(), 1);

        engine.set("hello", "again".into()).await.unwrap();
        assert_eq!(engine.get("hello").await.unwrap().as_deref(), Some("again"));
        assert_eq!(engine.count().await.unwrap(), 1);

        engine.delete("hello").await.unwrap();
        engine.delete("hello").await.unwrap();
        assert_eq!(engine.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_engine_batches() {
        let engine = ready().await;

        engine
            .set_many(vec![
                ("key1".into(), "value1".into()),
                ("key2".into(), "value2".into()),
                ("key1".into(), "value1b".into()),
            ])
            .await
            .unwrap();
        assert_eq!(engine.get("key1").await.unwrap().as_deref(), Some("value1b"));

        let found = engine
            .get_many(&owned(&["key1", "key2", "nope"]))
            .await
            .unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found["key2"].as_deref(), Some("value2"));
        assert_eq!(found["nope"], None);

        engine
            .delete_many(&owned(&["key1", "nope"]))
            .await
            .unwrap();
        let mut keys = engine.keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["key2"]);
        assert_eq!(engine.values().await.unwrap(), vec!["value2"]);

        engine.set_many(Vec::new()).await.unwrap();
        engine.delete_many(&[]).await.unwrap();
        assert!(engine.get_many(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_chunks_large_key_lists() {
        let engine = ready().await;

        let pairs: Vec<(String, String)> = (0..1_234)
            .map(|i| (format!("k{}", i), format!("v{}", i)))
            .collect();
        let keys: Vec<String> = pairs.iter().map(|(k, _)| k.clone()).collect();
        engine.set_many(pairs).await.unwrap();
        assert_eq!(engine.count().await.unwrap(), 1_234);

        let found = engine.get_many(&keys).await.unwrap();
        assert!(found.values().all(Option::is_some));

        engine.delete_many(&keys).await.unwrap();
        assert_eq!(engine.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_many_answers_only_requested_keys() {
        let engine = KvEngine::new("sqlite::memory:", &BrineConfig::default());

        // Case-insensitive key column, the way MySQL compares by default
        let conn = engine.manager().connect().await.unwrap();
        conn.adapter()
            .batch_execute(
                "CREATE TABLE brine (key TEXT COLLATE NOCASE NOT NULL PRIMARY KEY, value TEXT NOT NULL)",
            )
            .await
            .unwrap();
        engine.init().await.unwrap();
        engine.set("Key", "stored".into()).await.unwrap();

        let found = engine.get_many(&owned(&["key"])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["key"], None);
        assert!(!found.contains_key("Key"));
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let engine = ready().await;
        engine.set("existing", "kept".into()).await.unwrap();

        // Reject one specific key at the storage level
        let conn = engine.manager().acquire().unwrap();
        conn.adapter()
            .batch_execute(
                "CREATE TRIGGER reject_poison BEFORE INSERT ON brine \
                 WHEN NEW.key = 'poison' BEGIN SELECT RAISE(ABORT, 'poisoned key'); END",
            )
            .await
            .unwrap();

        let err = engine
            .set_many(vec![
                ("fresh".into(), "1".into()),
                ("existing".into(), "overwritten".into()),
                ("poison".into(), "2".into()),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, KvError::BatchWrite(_)));
        assert!(err.to_string().contains("poisoned key"));
        assert_eq!(engine.get("fresh").await.unwrap(), None);
        assert_eq!(engine.get("existing").await.unwrap().as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_operations_require_init() {
        let engine = KvEngine::new("sqlite::memory:", &BrineConfig::default());

        assert!(matches!(engine.get("k").await, Err(KvError::NotInitialized)));
        assert!(matches!(engine.count().await, Err(KvError::NotInitialized)));
        assert!(matches!(
            engine.set_many(Vec::new()).await,
            Err(KvError::NotInitialized)
        ));

        engine.init().await.unwrap();
        engine.clear().await.unwrap();
        engine.close().await.unwrap();

        assert!(matches!(engine.keys().await, Err(KvError::NotInitialized)));
        assert!(matches!(engine.init().await, Err(KvError::NotInitialized)));
    }
}
