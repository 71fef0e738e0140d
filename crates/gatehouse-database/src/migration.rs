//! Embedded schema migrations.

use std::collections::HashSet;

use serde::Serialize;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use gatehouse_core::error::{AppError, ErrorKind};

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// One bundled migration and whether the database has applied it.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    pub version: i64,
    pub description: String,
    pub applied: bool,
}

fn migrate_error(e: impl std::error::Error + Send + Sync + 'static, what: &str) -> AppError {
    AppError::with_source(ErrorKind::Database, format!("{what}: {e}"), e)
}

/// Applies every pending migration from `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!(bundled = MIGRATOR.iter().count(), "Running database migrations");
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| migrate_error(e, "Failed to run migrations"))?;
    info!("Database migrations completed");
    Ok(())
}

/// Bundled migrations in version order, flagged with their applied state.
pub async fn migration_status(pool: &PgPool) -> Result<Vec<MigrationStatus>, AppError> {
    // The bookkeeping table only exists after the first run.
    let tracked: bool = sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
        .fetch_one(pool)
        .await
        .map_err(|e| migrate_error(e, "Failed to inspect migrations"))?;

    let applied: HashSet<i64> = if tracked {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .map_err(|e| migrate_error(e, "Failed to read applied migrations"))?
            .into_iter()
            .collect()
    } else {
        HashSet::new()
    };

    Ok(MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| MigrationStatus {
            version: m.version,
            description: m.description.to_string(),
            applied: applied.contains(&m.version),
        })
        .collect())
}
