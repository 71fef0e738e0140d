//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod auth;
pub mod database;
pub mod logging;
pub mod rbac;
pub mod token;

use serde::{Deserialize, Serialize};

pub use self::auth::AuthConfig;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::rbac::RbacConfig;
pub use self::token::{OverflowStrategy, TokenConfig, TokenScheme};

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// (default.toml + environment overlay + `GATEHOUSE__*` variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Credential settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Token lifecycle settings.
    #[serde(default)]
    pub token: TokenConfig,
    /// Authorization resolver settings.
    #[serde(default)]
    pub rbac: RbacConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// `path` names the base file (with or without the `.toml` extension).
    /// An optional overlay named by `GATEHOUSE_ENV` (e.g. `config/production`)
    /// and environment variables prefixed with `GATEHOUSE__` are merged on top.
    pub fn load(path: &str) -> Result<Self, AppError> {
        let base = path.trim_end_matches(".toml");
        let env = std::env::var("GATEHOUSE_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(base).required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("GATEHOUSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "database": { "url": "postgres://localhost/gatehouse" }
        }))
        .expect("config should deserialize");

        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.auth.min_age_years, 14);
        assert_eq!(config.token.scheme, TokenScheme::Jwt);
        assert_eq!(config.token.max_active_per_user, 5);
        assert_eq!(config.token.access_ttl_minutes, 30);
        assert_eq!(config.token.refresh_ttl_hours, 720);
        assert_eq!(config.token.overflow_strategy, OverflowStrategy::EvictOldest);
        assert_eq!(config.rbac.cache_ttl_seconds, 0);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_token_enums_use_snake_case() {
        let token: TokenConfig = serde_json::from_value(serde_json::json!({
            "scheme": "opaque",
            "overflow_strategy": "reject"
        }))
        .expect("token config should deserialize");

        assert_eq!(token.scheme, TokenScheme::Opaque);
        assert_eq!(token.overflow_strategy, OverflowStrategy::Reject);
        assert_eq!(token.overflow_strategy.to_string(), "reject");
    }
}
