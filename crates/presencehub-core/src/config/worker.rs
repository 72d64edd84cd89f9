//! Staleness sweep worker configuration.

use serde::{Deserialize, Serialize};

/// Staleness sweep worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the sweep scheduler is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in minutes between sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,
    /// Maximum age in minutes of an `online` claim before it is
    /// considered stale and demoted to offline.
    #[serde(default = "default_stale_window")]
    pub stale_window_minutes: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_minutes: default_sweep_interval(),
            stale_window_minutes: default_stale_window(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    15
}

fn default_stale_window() -> i64 {
    15
}
