//! Schema migration for the key-value table

use crate::error::{KvError, KvResult};
use crate::manager::Connection;

/// Create the key-value table unless it already exists.
///
/// Idempotent and never drops data.
pub async fn migrate(connection: &Connection) -> KvResult<()> {
    let ddl = connection.dialect().create_table();

    connection
        .adapter()
        .batch_execute(&ddl.sql)
        .await
        .map_err(KvError::Migration)?;

    tracing::info!(backend = %connection.backend(), "schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ConnectionManager;
    use brine_sql::ConnectOptions;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let manager = ConnectionManager::new("sqlite::memory:", ConnectOptions::default());
        let connection = manager.connect().await.unwrap();

        migrate(&connection).await.unwrap();
        connection
            .adapter()
            .execute(
                "INSERT INTO brine (key, value) VALUES (?, ?)",
                &["k".into(), "v".into()],
            )
            .await
            .unwrap();

        migrate(&connection).await.unwrap();

        let rows = connection
            .adapter()
            .query("SELECT value FROM brine", &[])
            .await
            .unwrap();
        assert_eq!(rows.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_ddl_is_migration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.db");
        std::fs::File::create(&path).unwrap();

        let uri = format!("sqlite:{}?mode=ro", path.display());
        let manager = ConnectionManager::new(uri, ConnectOptions::default());
        let connection = manager.connect().await.unwrap();

        assert!(matches!(
            migrate(&connection).await,
            Err(KvError::Migration(_))
        ));
    }
}
