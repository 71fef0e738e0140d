//! Authorization resolver configuration.

use serde::{Deserialize, Serialize};

/// Permission resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// TTL of cached per-user permission sets in seconds. `0` disables caching.
    #[serde(default)]
    pub cache_ttl_seconds: u64,
    /// Maximum number of users whose permission sets are cached.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 0,
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}
