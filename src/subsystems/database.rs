//! Database subsystem.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::Mutex;

use crate::config::DatabaseConfig;
use crate::subsystems::SubsystemError;

/// Lifecycle contract of the persistent store.
#[async_trait]
pub trait Database: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Establish pooled connectivity. Calling it again after success is a no-op.
    async fn initialize(&self) -> Result<(), SubsystemError>;

    /// Release all connections. Safe to call more than once.
    async fn close(&self) -> Result<(), SubsystemError>;
}

/// PostgreSQL connection pool owned by the process.
pub struct PostgresDatabase {
    config: DatabaseConfig,
    pool: Mutex<Option<PgPool>>,
}

impl PostgresDatabase {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config,
            pool: Mutex::new(None),
        }
    }

    /// The live pool, once `initialize` has succeeded and until `close`.
    pub async fn pool(&self) -> Option<PgPool> {
        self.pool.lock().await.clone()
    }
}

#[async_trait]
impl Database for PostgresDatabase {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn initialize(&self) -> Result<(), SubsystemError> {
        let mut slot = self.pool.lock().await;
        if slot.is_some() {
            tracing::debug!("Database pool already initialized");
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.config.max_connections)
            .min_connections(self.config.min_connections)
            .acquire_timeout(Duration::from_secs(self.config.acquire_timeout_secs))
            .connect(&self.config.url)
            .await
            .map_err(|e| SubsystemError::connect(self.name(), e))?;

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            pool.close().await;
            return Err(SubsystemError::connect(self.name(), e));
        }

        tracing::info!(
            max_connections = self.config.max_connections,
            "Database pool initialized"
        );
        *slot = Some(pool);
        Ok(())
    }

    async fn close(&self) -> Result<(), SubsystemError> {
        let pool = self.pool.lock().await.take();
        match pool {
            Some(pool) => {
                pool.close().await;
                tracing::info!("Database pool closed");
            }
            None => tracing::debug!("Database pool not open, nothing to close"),
        }
        Ok(())
    }
}
