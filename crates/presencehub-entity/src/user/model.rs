//! User record entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use presencehub_core::types::UserId;

use crate::presence::PresenceState;

/// Collection holding one profile record per user, keyed by user id.
pub const COLLECTION: &str = "users";

/// Field names of the user record as stored.
pub mod fields {
    /// Last client-reported activity, epoch milliseconds (client clock).
    pub const RECENTLY_ACTIVE: &str = "recentlyActive";
    /// Denormalized copy of the presence state.
    pub const STATUS: &str = "status";
    /// Last modification time of the record.
    pub const UPDATED_AT: &str = "updatedAt";
}

/// A user profile record.
///
/// The rating, rent, and score fields are carried as data for the
/// surrounding application; this crate never computes the score. The
/// `status` field is a denormalized copy of the status document's state,
/// written both by activity updates and by the staleness sweep, and is
/// only loosely consistent with the status document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Unique user identifier.
    pub id: UserId,
    /// Email address.
    pub email: String,
    /// Human-readable display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// When the record was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the record was last updated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Average of weighted ratings across all rents.
    pub total_average_weight_ratings: f64,
    /// Number of completed rents.
    pub number_of_rents: u32,
    /// Last client-reported activity, epoch milliseconds (client clock).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recently_active: Option<i64>,
    /// Precomputed ranking score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_score: Option<f64>,
    /// Denormalized presence state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PresenceState>,
}
