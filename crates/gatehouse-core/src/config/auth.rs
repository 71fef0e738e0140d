//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credential and registration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Minimum age in whole years required to register.
    #[serde(default = "default_min_age_years")]
    pub min_age_years: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            min_age_years: default_min_age_years(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_min_age_years() -> u32 {
    14
}
