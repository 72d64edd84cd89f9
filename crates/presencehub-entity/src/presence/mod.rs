//! Presence domain entities.

pub mod model;

pub use model::StatusDocument;

use serde::{Deserialize, Serialize};

/// A user's advertised connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceState {
    /// User has a live session with a visible surface.
    Online,
    /// User has a live session but the surface is hidden.
    Away,
    /// User has no live session (or the session was never announced).
    Offline,
}

impl PresenceState {
    /// Check if the state counts as a live session.
    pub fn is_online(&self) -> bool {
        !matches!(self, Self::Offline)
    }

    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresenceState {
    type Err = presencehub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "offline" => Ok(Self::Offline),
            _ => Err(presencehub_core::AppError::validation(format!(
                "Invalid presence state: '{s}'"
            ))),
        }
    }
}
