//! Manager configuration.

use serde::{Deserialize, Serialize};

/// How a write fans out across the local tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// One tier after another, in stack order.
    #[default]
    Sequential,
    /// All local tiers at once.
    Parallel,
}

/// Configuration for a [`crate::CacheManager`].
///
/// Passed explicitly at construction; there is no process-wide instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Fan-out of writes across local tiers.
    pub write_mode: WriteMode,
    /// Share one in-flight remote fetch between identical concurrent reads.
    pub coalesce_remote_reads: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::Sequential,
            coalesce_remote_reads: true,
        }
    }
}

impl ManagerConfig {
    /// Parses a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
