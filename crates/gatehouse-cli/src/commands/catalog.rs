//! Role and permission catalogue commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use gatehouse_core::error::AppError;
use gatehouse_entity::policy::{CatalogEntry, NewCatalogEntry};
use gatehouse_service::{CatalogService, RequestContext};

use crate::output::{self, OutputFormat};

/// Arguments for role and permission commands
#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// Catalogue subcommand
    #[command(subcommand)]
    pub command: CatalogCommand,
}

/// Catalogue subcommands
#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List live entries
    List,
    /// Create an entry
    Create {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Unique code
        #[arg(short, long)]
        code: String,
        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Soft-delete an entry
    SoftDelete {
        /// Entry id
        id: Uuid,
    },
    /// Restore a soft-deleted entry
    Restore {
        /// Entry id
        id: Uuid,
    },
    /// Permanently delete an entry and its links
    Delete {
        /// Entry id
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Show the change history of an entry
    History {
        /// Entry id
        id: Uuid,
    },
    /// Undo a logged change
    Revert {
        /// Change log entry id
        log_id: Uuid,
    },
}

/// Catalogue display row for table output
#[derive(Debug, Serialize, Tabled)]
struct EntryRow {
    id: String,
    code: String,
    name: String,
    description: String,
}

impl EntryRow {
    fn from_entry<E: CatalogEntry>(entry: &E) -> Self {
        Self {
            id: entry.id().to_string(),
            code: entry.code().to_string(),
            name: entry.name().to_string(),
            description: entry.description().unwrap_or_default().to_string(),
        }
    }
}

/// History display row for table output
#[derive(Debug, Serialize, Tabled)]
struct HistoryRow {
    id: String,
    action: String,
    changed_by: String,
    changed_at: String,
    fields: String,
}

/// Execute catalogue commands against roles or permissions
pub async fn execute<E: CatalogEntry>(
    args: &CatalogArgs,
    service: &CatalogService<E>,
    format: OutputFormat,
) -> Result<(), AppError> {
    let sys = RequestContext::system();

    match &args.command {
        CatalogCommand::List => {
            let entries = service.list(&sys).await?;
            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from_entry).collect();
            output::print_list(&rows, format);
        }
        CatalogCommand::Create {
            name,
            code,
            description,
        } => {
            let entry = service
                .create(
                    &sys,
                    NewCatalogEntry {
                        name: name.clone(),
                        description: description.clone(),
                        code: code.clone(),
                    },
                )
                .await?;
            output::print_item(&EntryRow::from_entry(&entry), format);
        }
        CatalogCommand::SoftDelete { id } => {
            service.soft_delete(&sys, *id).await?;
            output::print_success(&format!("{} {id} soft-deleted", E::LABEL));
        }
        CatalogCommand::Restore { id } => {
            let entry = service.restore(&sys, *id).await?;
            output::print_item(&EntryRow::from_entry(&entry), format);
        }
        CatalogCommand::Delete { id, force } => {
            let prompt = format!("Permanently delete {} {id} and all its links?", E::LABEL);
            if !super::confirm(&prompt, *force)? {
                output::print_warning("Cancelled.");
                return Ok(());
            }
            service.delete(&sys, *id).await?;
            output::print_success(&format!("{} {id} deleted", E::LABEL));
        }
        CatalogCommand::History { id } => {
            let history = service.history(&sys, *id).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
                OutputFormat::Table => {
                    let rows: Vec<HistoryRow> = history
                        .iter()
                        .map(|h| HistoryRow {
                            id: h.log.id.to_string(),
                            action: h.log.action.clone(),
                            changed_by: h.log.changed_by.to_string(),
                            changed_at: output::timestamp(h.log.changed_at),
                            fields: h.changes.keys().cloned().collect::<Vec<_>>().join(", "),
                        })
                        .collect();
                    output::print_list(&rows, format);
                }
            }
        }
        CatalogCommand::Revert { log_id } => {
            let entry = service.revert(&sys, *log_id).await?;
            output::print_item(&EntryRow::from_entry(&entry), format);
        }
    }

    Ok(())
}
