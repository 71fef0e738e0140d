//! Database migration commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_database::DatabasePool;
use gatehouse_database::migration;

use crate::output::{self, OutputFormat};

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Apply all pending migrations
    Run,
    /// List bundled migrations and whether each is applied
    Status,
}

#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    version: i64,
    description: String,
    applied: bool,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let pool = DatabasePool::connect(&config.database).await?;

    match &args.command {
        MigrateCommand::Run => {
            migration::run_migrations(pool.pool()).await?;
            output::print_success("Schema is up to date.");
        }
        MigrateCommand::Status => {
            let rows: Vec<StatusRow> = migration::migration_status(pool.pool())
                .await?
                .into_iter()
                .map(|m| StatusRow {
                    version: m.version,
                    description: m.description,
                    applied: m.applied,
                })
                .collect();
            let pending = rows.iter().filter(|r| !r.applied).count();
            output::print_list(&rows, format);
            if pending > 0 && format == OutputFormat::Table {
                output::print_warning(&format!("{pending} migration(s) pending"));
            }
        }
    }

    Ok(())
}
