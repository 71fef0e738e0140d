//! Permission check command.

use clap::Args;

use gatehouse_core::config::AppConfig;
use gatehouse_core::error::AppError;

use crate::output;

/// Arguments for the check command
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Username
    pub username: String,
    /// Permission code, e.g. `read-role`
    pub code: String,
    /// Also list every code the user holds
    #[arg(long)]
    pub all: bool,
}

/// Execute the check command
pub async fn execute(args: &CheckArgs, config: &AppConfig) -> Result<(), AppError> {
    let app = super::connect(config).await?;
    let user = super::find_user(&app, &args.username).await?;

    if app.resolver.check(&args.code, &user).await? {
        output::print_success(&format!("'{}' holds '{}'", args.username, args.code));
    } else {
        output::print_warning(&format!("'{}' does not hold '{}'", args.username, args.code));
    }

    if args.all {
        for code in app.resolver.permission_codes(&user).await? {
            output::print_kv("code", &code);
        }
    }
    Ok(())
}
