//! Token lifecycle configuration.

use serde::{Deserialize, Serialize};

/// Session token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Credential encoding used for issued tokens.
    #[serde(default)]
    pub scheme: TokenScheme,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in hours.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_hours: u64,
    /// Maximum number of simultaneously active sessions per user.
    #[serde(default = "default_max_active")]
    pub max_active_per_user: u32,
    /// What to do when a new session would exceed the ceiling.
    #[serde(default)]
    pub overflow_strategy: OverflowStrategy,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            scheme: TokenScheme::default(),
            access_ttl_minutes: default_access_ttl(),
            refresh_ttl_hours: default_refresh_ttl(),
            max_active_per_user: default_max_active(),
            overflow_strategy: OverflowStrategy::default(),
        }
    }
}

/// Credential encoding. Both variants are tracked server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScheme {
    /// HS256-signed JWT carrying the session identifier.
    Jwt,
    /// Random bearer string carrying the session identifier and a secret.
    Opaque,
}

impl Default for TokenScheme {
    fn default() -> Self {
        Self::Jwt
    }
}

impl std::fmt::Display for TokenScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenScheme::Jwt => write!(f, "jwt"),
            TokenScheme::Opaque => write!(f, "opaque"),
        }
    }
}

/// Strategy applied when a user tries to exceed their active token ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Deactivate the oldest active sessions to make room.
    EvictOldest,
    /// Refuse the new session.
    Reject,
}

impl Default for OverflowStrategy {
    fn default() -> Self {
        Self::EvictOldest
    }
}

impl std::fmt::Display for OverflowStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowStrategy::EvictOldest => write!(f, "evict_oldest"),
            OverflowStrategy::Reject => write!(f, "reject"),
        }
    }
}

fn default_access_ttl() -> u64 {
    30
}

fn default_refresh_ttl() -> u64 {
    24 * 30
}

fn default_max_active() -> u32 {
    5
}
