//! Presence publisher configuration.

use serde::{Deserialize, Serialize};

/// Presence publisher (client-side) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Interval in seconds between heartbeat activity updates while online.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    60
}
