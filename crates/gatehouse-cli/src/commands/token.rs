//! Session token commands.

use chrono::{Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_entity::token::RevokeReason;

use crate::output::{self, OutputFormat};

/// Arguments for token commands
#[derive(Debug, Args)]
pub struct TokenArgs {
    /// Token subcommand
    #[command(subcommand)]
    pub command: TokenCommand,
}

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// List the live sessions of a user
    List {
        /// Username
        username: String,
    },
    /// Revoke every session of a user
    RevokeAll {
        /// Username
        username: String,
    },
    /// Delete records that expired or were revoked a while ago
    Purge {
        /// Keep records from the last N days
        #[arg(short, long, default_value_t = 7)]
        days: i64,
    },
}

/// Session display row for table output
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    session_id: String,
    created_at: String,
    access_expires_at: String,
    refresh_expires_at: String,
}

/// Execute token commands
pub async fn execute(args: &TokenArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let app = super::connect(config).await?;

    match &args.command {
        TokenCommand::List { username } => {
            let user = super::find_user(&app, username).await?;
            let rows: Vec<SessionRow> = app
                .tokens
                .sessions_of(user.id)
                .await?
                .iter()
                .map(|s| SessionRow {
                    session_id: s.session_id.to_string(),
                    created_at: output::timestamp(s.created_at),
                    access_expires_at: output::timestamp(s.access_expires_at),
                    refresh_expires_at: output::timestamp(s.refresh_expires_at),
                })
                .collect();
            output::print_list(&rows, format);
        }
        TokenCommand::RevokeAll { username } => {
            let user = super::find_user(&app, username).await?;
            let count = app.tokens.revoke_user(user.id, RevokeReason::Admin).await?;
            output::print_success(&format!("Revoked {count} session(s) of '{username}'"));
        }
        TokenCommand::Purge { days } => {
            if *days < 0 {
                return Err(AppError::validation("--days must not be negative"));
            }
            let purged = app
                .tokens
                .purge_expired(Utc::now() - Duration::days(*days))
                .await?;
            output::print_success(&format!("Purged {purged} token record(s)"));
        }
    }

    Ok(())
}
