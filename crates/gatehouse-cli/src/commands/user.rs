//! User management commands.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use gatehouse_auth::PasswordHasher;
use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_entity::policy::Role;
use gatehouse_entity::token::RevokeReason;
use gatehouse_service::{RegisterRequest, RequestContext};

use crate::output::{self, OutputFormat};

/// Arguments for user commands
#[derive(Debug, Args)]
pub struct UserArgs {
    /// User subcommand
    #[command(subcommand)]
    pub command: UserCommand,
}

/// User subcommands
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List all users
    List,
    /// Register a new user
    Create {
        /// Username
        #[arg(short, long)]
        username: String,
        /// Email
        #[arg(short, long)]
        email: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(short, long)]
        birthdate: NaiveDate,
        /// Password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show the live roles of a user
    Roles {
        /// Username
        username: String,
    },
    /// Replace the roles of a user
    AssignRoles {
        /// Username
        username: String,
        /// Role codes
        #[arg(required = true)]
        roles: Vec<String>,
    },
    /// Set a new password for a user
    ResetPassword {
        /// Username
        username: String,
        /// New password (will prompt if not provided)
        #[arg(short, long)]
        password: Option<String>,
    },
}

/// User display row for table output
#[derive(Debug, Serialize, Tabled)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    birthdate: String,
    created_at: String,
}

/// Role display row for table output
#[derive(Debug, Serialize, Tabled)]
struct RoleRow {
    id: String,
    code: String,
    name: String,
}

impl From<&Role> for RoleRow {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.to_string(),
            code: role.code.clone(),
            name: role.name.clone(),
        }
    }
}

fn prompt_password(prompt: &str) -> Result<String, AppError> {
    dialoguer::Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

/// Execute user commands
pub async fn execute(args: &UserArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let app = super::connect(config).await?;
    let sys = RequestContext::system();

    match &args.command {
        UserCommand::List => {
            let users = app.user_roles.list_users(&sys).await?;
            let rows: Vec<UserRow> = users
                .iter()
                .map(|u| UserRow {
                    id: u.id.to_string(),
                    username: u.username.clone(),
                    email: u.email.clone(),
                    birthdate: u.birthdate.to_string(),
                    created_at: output::timestamp(u.created_at),
                })
                .collect();
            output::print_list(&rows, format);
        }
        UserCommand::Create {
            username,
            email,
            birthdate,
            password,
        } => {
            let password = match password {
                Some(p) => p.clone(),
                None => prompt_password("Password")?,
            };
            let user = app
                .accounts
                .register(RegisterRequest {
                    username: username.clone(),
                    email: email.clone(),
                    password: password.clone(),
                    confirm_password: password,
                    birthdate: *birthdate,
                })
                .await?;
            output::print_success(&format!("User '{}' created (id: {})", user.username, user.id));
        }
        UserCommand::Roles { username } => {
            let user = super::find_user(&app, username).await?;
            let roles = app.user_roles.roles_of(&sys, user.id).await?;
            let rows: Vec<RoleRow> = roles.iter().map(RoleRow::from).collect();
            output::print_list(&rows, format);
        }
        UserCommand::AssignRoles { username, roles } => {
            let user = super::find_user(&app, username).await?;

            let mut role_ids = Vec::with_capacity(roles.len());
            for code in roles {
                let role = app
                    .stores
                    .roles
                    .find_live_by_code(code)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("Role '{code}' not found")))?;
                role_ids.push(role.id);
            }

            let links = app.user_roles.assign(&sys, user.id, &role_ids).await?;
            output::print_success(&format!(
                "User '{}' now holds {} role(s)",
                user.username,
                links.len()
            ));
        }
        UserCommand::ResetPassword { username, password } => {
            let user = super::find_user(&app, username).await?;
            let password = match password {
                Some(p) => p.clone(),
                None => prompt_password("New password")?,
            };

            let password_hash = PasswordHasher::new().hash_password(&password)?;
            app.stores.users.update_password(user.id, &password_hash).await?;
            let revoked = app.tokens.revoke_user(user.id, RevokeReason::Admin).await?;
            output::print_success(&format!(
                "Password reset for user '{username}', {revoked} session(s) revoked"
            ));
        }
    }

    Ok(())
}
