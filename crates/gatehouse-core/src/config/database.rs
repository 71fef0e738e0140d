//! Database configuration.

use serde::{Deserialize, Serialize};

/// PostgreSQL pool and session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Upper bound of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Connections kept open while idle.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// How long a caller waits for a free connection, in seconds.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
    /// Idle connections older than this are closed, in seconds. 0 keeps them.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Session `lock_timeout` in milliseconds. Bounds the wait on the row
    /// locks taken by token issuance and rotation. 0 disables it.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
    /// Session `statement_timeout` in milliseconds. 0 disables it.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Configuration with default pool settings for `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_seconds: default_acquire_timeout(),
            idle_timeout_seconds: default_idle_timeout(),
            lock_timeout_ms: default_lock_timeout(),
            statement_timeout_ms: default_statement_timeout(),
        }
    }

    /// Run-time parameters sent with every new connection.
    pub fn session_parameters(&self) -> Vec<(&'static str, String)> {
        [
            ("lock_timeout", self.lock_timeout_ms),
            ("statement_timeout", self.statement_timeout_ms),
        ]
        .into_iter()
        .filter(|(_, ms)| *ms > 0)
        .map(|(name, ms)| (name, ms.to_string()))
        .collect()
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_lock_timeout() -> u64 {
    5_000
}

fn default_statement_timeout() -> u64 {
    30_000
}
