//! CLI command definitions and dispatch.

pub mod catalog;
pub mod check;
pub mod grant;
pub mod migrate;
pub mod seed;
pub mod token;
pub mod user;

use clap::{Parser, Subcommand};

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_database::{DatabasePool, Stores};
use gatehouse_entity::user::User;
use gatehouse_service::Gatehouse;

use crate::output::OutputFormat;

/// Gatehouse: authentication and role-based access control
#[derive(Debug, Parser)]
#[command(name = "gatehouse", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Install the built-in roles and permissions
    Seed,
    /// User management
    User(user::UserArgs),
    /// Role management
    Role(catalog::CatalogArgs),
    /// Permission management
    Permission(catalog::CatalogArgs),
    /// Role-permission grants
    Grant(grant::GrantArgs),
    /// Session token management
    Token(token::TokenArgs),
    /// Check whether a user holds a permission code
    Check(check::CheckArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config, self.format).await,
            Commands::Seed => seed::execute(config, self.format).await,
            Commands::User(args) => user::execute(args, config, self.format).await,
            Commands::Role(args) => {
                let app = connect(config).await?;
                catalog::execute(args, &app.roles, self.format).await
            }
            Commands::Permission(args) => {
                let app = connect(config).await?;
                catalog::execute(args, &app.permissions, self.format).await
            }
            Commands::Grant(args) => grant::execute(args, config, self.format).await,
            Commands::Token(args) => token::execute(args, config, self.format).await,
            Commands::Check(args) => check::execute(args, config).await,
        }
    }
}

/// Helper: wire the services over the configured database
pub async fn connect(config: &AppConfig) -> Result<Gatehouse, AppError> {
    let pool = DatabasePool::connect(&config.database).await?;
    Ok(Gatehouse::new(Stores::postgres(pool.into_pool()), config))
}

/// Helper: look up a user by name
pub async fn find_user(app: &Gatehouse, username: &str) -> Result<User, AppError> {
    app.stores
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User '{username}' not found")))
}

/// Helper: ask for confirmation unless `force` is set
pub fn confirm(prompt: &str, force: bool) -> Result<bool, AppError> {
    if force {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}
