//! Heartbeat timer and activity updates.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::warn;

use presencehub_core::types::UserId;
use presencehub_entity::user;
use presencehub_store::{DocumentFields, DocumentStore};

/// Push one activity update onto the user's profile record.
///
/// `recentlyActive` carries the client clock (the profile owner reads it
/// as "what the client last said"); the trustworthy timestamp lives on
/// the status document instead. Failures are logged and swallowed.
pub(crate) async fn push_activity(store: &Arc<dyn DocumentStore>, user_id: &UserId) {
    let fields = DocumentFields::new().set(
        user::model::fields::RECENTLY_ACTIVE,
        Utc::now().timestamp_millis(),
    );
    if let Err(e) = store
        .update(user::model::COLLECTION, &user_id.to_string(), fields)
        .await
    {
        warn!(user_id = %user_id, error = %e, "activity update failed");
    }
}

/// An owned handle to the one heartbeat timer a session may run.
///
/// The timer is aborted on [`cancel`](Self::cancel) and on drop, so the
/// handle's owner cannot leak a second live timer by replacing it.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Spawn the heartbeat loop: one activity update per period, first
    /// tick a full period after start (the transition that started the
    /// heartbeat already pushed an immediate update).
    pub(crate) fn start(period: Duration, store: Arc<dyn DocumentStore>, user_id: UserId) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                push_activity(&store, &user_id).await;
            }
        });
        Self { task }
    }

    /// Stop the heartbeat.
    pub(crate) fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
