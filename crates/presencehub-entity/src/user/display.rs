//! Presence display helpers for user-facing views.
//!
//! These translate the raw `recentlyActive` / `status` fields into the
//! strings the directory UI shows next to each user.

use chrono::Utc;

use super::model::UserRecord;
use crate::presence::PresenceState;

/// Default window in minutes within which a user counts as recently active.
pub const DEFAULT_ACTIVITY_THRESHOLD_MINUTES: i64 = 5;

/// Whether the user was active within the given threshold.
///
/// `recently_active` is a client-clock epoch-millisecond timestamp; a
/// missing value is never recently active.
pub fn is_recently_active(recently_active: Option<i64>, threshold_minutes: i64) -> bool {
    let Some(ts) = recently_active else {
        return false;
    };
    let threshold_ms = threshold_minutes * 60 * 1000;
    Utc::now().timestamp_millis() - ts < threshold_ms
}

/// Format the user's last activity as a human-readable relative time.
pub fn format_last_active(recently_active: Option<i64>) -> String {
    let Some(ts) = recently_active else {
        return "Unknown".to_string();
    };

    let diff_seconds = (Utc::now().timestamp_millis() - ts) / 1000;

    if diff_seconds < 60 {
        return "Just now".to_string();
    }

    let diff_minutes = diff_seconds / 60;
    if diff_minutes < 60 {
        return plural(diff_minutes, "minute");
    }

    let diff_hours = diff_minutes / 60;
    if diff_hours < 24 {
        return plural(diff_hours, "hour");
    }

    let diff_days = diff_hours / 24;
    if diff_days < 30 {
        return plural(diff_days, "day");
    }

    let diff_months = diff_days / 30;
    if diff_months < 12 {
        return plural(diff_months, "month");
    }

    plural(diff_months / 12, "year")
}

/// Resolve the status string shown for a user.
///
/// `online` and `away` claims win outright; otherwise the record's own
/// activity timestamp decides between "Recently Active" and a last-seen
/// line.
pub fn status_display(user: &UserRecord) -> String {
    match user.status {
        Some(PresenceState::Online) => "Online".to_string(),
        Some(PresenceState::Away) => "Away".to_string(),
        _ => {
            if is_recently_active(user.recently_active, DEFAULT_ACTIVITY_THRESHOLD_MINUTES) {
                "Recently Active".to_string()
            } else {
                format!("Last seen {}", format_last_active(user.recently_active))
            }
        }
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
