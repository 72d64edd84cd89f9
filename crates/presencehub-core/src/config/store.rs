//! Document store configuration.

use serde::{Deserialize, Serialize};

/// Document store backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store provider name. Currently only `"memory"` is supported.
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}
