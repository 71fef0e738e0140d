//! Built-in policy seeding.

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Execute the seed command
pub async fn execute(config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let app = super::connect(config).await?;
    let report = app.seed().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => output::print_success(&format!(
            "Seeded {} roles, {} permissions and {} grants",
            report.roles_created, report.permissions_created, report.grants_created
        )),
    }
    Ok(())
}
