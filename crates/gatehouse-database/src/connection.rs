//! PostgreSQL connection pool.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use gatehouse_core::config::DatabaseConfig;
use gatehouse_core::error::{AppError, ErrorKind};

/// Shared handle to the PostgreSQL pool backing every repository.
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Opens a pool whose connections carry the configured session timeouts.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    format!("Invalid database URL: {e}"),
                    e,
                )
            })?
            .options(config.session_parameters());

        info!(
            host = options.get_host(),
            database = options.get_database().unwrap_or_default(),
            max_connections = config.max_connections,
            lock_timeout_ms = config.lock_timeout_ms,
            "Connecting to PostgreSQL"
        );

        let idle_timeout = (config.idle_timeout_seconds > 0)
            .then(|| Duration::from_secs(config.idle_timeout_seconds));

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(idle_timeout)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        Ok(Self { pool })
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Take the underlying pool, e.g. to build [`crate::Stores::postgres`].
    pub fn into_pool(self) -> PgPool {
        self.pool
    }
}
