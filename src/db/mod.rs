/// Database layer for Bloodlink
///
/// Owns the SQLite connection pool and the embedded migrations. Storage rows
/// live in the submodules and are converted into domain records by the
/// managers that read them.

pub mod account;
pub mod blood_bank;
pub mod contact;
pub mod event;
pub mod request;

use crate::{
    config::StorageConfig,
    error::{AppError, AppResult},
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Handle to the application database
///
/// Constructed once at startup and cloned into every manager. Clones share the
/// same pool; `close` shuts it down for all of them.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database described by `config` and run migrations
    pub async fn open(config: &StorageConfig) -> AppResult<Self> {
        let is_memory = config.database_path.as_os_str() == ":memory:";

        let base = if is_memory {
            SqliteConnectOptions::from_str(":memory:")?
        } else {
            if let Some(parent) = config.database_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        let options = base.foreign_keys(true).busy_timeout(Duration::from_secs(5));

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10));
        if is_memory {
            // The in-memory database lives only as long as a connection does
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;

        let db = Self { pool };
        db.migrate().await?;
        db.ping().await?;

        tracing::info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "database opened"
        );

        Ok(db)
    }

    /// Single-connection in-memory database with the schema applied
    pub async fn in_memory() -> AppResult<Self> {
        Self::open(&StorageConfig {
            database_path: ":memory:".into(),
            max_connections: 1,
        })
        .await
    }

    /// Run embedded migrations
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Check the database answers
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection; later queries fail
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_runs_migrations() {
        let db = Database::in_memory().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
        )
        .fetch_all(db.pool())
        .await
        .unwrap();

        for expected in [
            "account",
            "bank_notification",
            "blood_bank",
            "blood_request",
            "blood_request_history",
            "contact_message",
            "contact_note",
            "event",
            "event_registration",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_open_file_database_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("nested").join("test.sqlite"),
            max_connections: 2,
        };

        let db = Database::open(&config).await.unwrap();
        assert!(config.database_path.exists());

        db.close().await;
        assert!(db.is_closed());
        assert!(db.ping().await.is_err());
    }
}
