use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{SnapshotStore, SNAPSHOT_SLOT};
use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::model::AppSnapshot;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed snapshot store
#[derive(Clone)]
pub struct SqliteSnapshotStore {
    pool: SqlitePool,
    slot: String,
}

impl SqliteSnapshotStore {
    /// Open (or create) the database at the configured path
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        Self::from_pool(pool).await
    }

    /// In-memory database, for tests
    pub async fn new_in_memory() -> StorageResult<Self> {
        // One connection: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        let store = Self {
            pool,
            slot: SNAPSHOT_SLOT.to_string(),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Use a different slot name
    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = slot.into();
        self
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn load(&self) -> StorageResult<Option<AppSnapshot>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT data
            FROM snapshots
            WHERE slot = ?
            "#,
        )
        .bind(&self.slot)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((data,)) => {
                debug!(slot = %self.slot, bytes = data.len(), "Loaded snapshot");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, snapshot: &AppSnapshot) -> StorageResult<()> {
        let data = serde_json::to_string(snapshot)?;

        sqlx::query(
            r#"
            INSERT INTO snapshots (slot, data, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(slot) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.slot)
        .bind(&data)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        debug!(slot = %self.slot, bytes = data.len(), "Saved snapshot");
        Ok(())
    }
}
