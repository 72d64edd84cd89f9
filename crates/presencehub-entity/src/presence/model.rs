//! Status document value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PresenceState;

/// Collection holding one status document per user, keyed by user id.
pub const COLLECTION: &str = "status";

/// Field names of the status document as stored.
pub mod fields {
    /// The advertised presence state.
    pub const STATE: &str = "state";
    /// Store-assigned time of the last status write.
    pub const LAST_CHANGED: &str = "lastChanged";
}

/// The status document advertising a user's presence.
///
/// `last_changed` is assigned by the store on every write; clients pass a
/// server-timestamp sentinel instead of a value of their own, so clock
/// skew on the client cannot corrupt staleness decisions. An absent
/// document is treated as implicitly offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDocument {
    /// Self-reported presence state.
    pub state: PresenceState,
    /// Store-assigned time of the last write, non-decreasing per document.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_changed: DateTime<Utc>,
}
