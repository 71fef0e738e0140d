//! Role-permission grant commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;
use gatehouse_entity::policy::{Permission, Role};
use gatehouse_service::{Gatehouse, RequestContext};

use crate::output::{self, OutputFormat};

/// Arguments for grant commands
#[derive(Debug, Args)]
pub struct GrantArgs {
    /// Grant subcommand
    #[command(subcommand)]
    pub command: GrantCommand,
}

/// Grant subcommands
#[derive(Debug, Subcommand)]
pub enum GrantCommand {
    /// List the permissions of a role
    List {
        /// Role code
        role: String,
    },
    /// Grant a permission to a role
    Add {
        /// Role code
        role: String,
        /// Permission code
        permission: String,
    },
    /// Remove a permission from a role
    Remove {
        /// Role code
        role: String,
        /// Permission code
        permission: String,
    },
}

/// Permission display row for table output
#[derive(Debug, Serialize, Tabled)]
struct PermissionRow {
    id: String,
    code: String,
    name: String,
}

async fn role(app: &Gatehouse, code: &str) -> Result<Role, AppError> {
    app.stores
        .roles
        .find_live_by_code(code)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Role '{code}' not found")))
}

async fn permission(app: &Gatehouse, code: &str) -> Result<Permission, AppError> {
    app.stores
        .permissions
        .find_live_by_code(code)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Permission '{code}' not found")))
}

/// Execute grant commands
pub async fn execute(args: &GrantArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let app = super::connect(config).await?;
    let sys = RequestContext::system();

    match &args.command {
        GrantCommand::List { role: code } => {
            let role = role(&app, code).await?;
            let rows: Vec<PermissionRow> = app
                .grants
                .permissions_of(&sys, role.id)
                .await?
                .iter()
                .map(|p| PermissionRow {
                    id: p.id.to_string(),
                    code: p.code.clone(),
                    name: p.name.clone(),
                })
                .collect();
            output::print_list(&rows, format);
        }
        GrantCommand::Add {
            role: role_code,
            permission: permission_code,
        } => {
            let role = role(&app, role_code).await?;
            let permission = permission(&app, permission_code).await?;
            app.grants.grant(&sys, role.id, permission.id).await?;
            output::print_success(&format!("Granted '{permission_code}' to '{role_code}'"));
        }
        GrantCommand::Remove {
            role: role_code,
            permission: permission_code,
        } => {
            let role = role(&app, role_code).await?;
            let permission = permission(&app, permission_code).await?;
            app.grants.remove(&sys, role.id, permission.id).await?;
            output::print_success(&format!("Removed '{permission_code}' from '{role_code}'"));
        }
    }

    Ok(())
}
