//! The presence publisher state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use presencehub_core::config::presence::PresenceConfig;
use presencehub_core::types::UserId;
use presencehub_entity::presence::{self, PresenceState};
use presencehub_store::{DocumentFields, DocumentStore};

use crate::events::SessionEvent;
use crate::heartbeat::{self, HeartbeatHandle};

/// The publisher's view of this session's connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No live store connection observed yet.
    Disconnected,
    /// Connected with a visible surface; heartbeat running.
    Online,
    /// Connected but the surface is hidden; heartbeat stopped.
    Away,
    /// Session ended. Terminal.
    Offline,
}

/// Maintains a best-effort external signal of one client session's
/// connectivity state.
///
/// All transitions run on the caller's task, one event at a time, so the
/// machine needs no locking. Every store write is best-effort: failures
/// are logged and the state still advances, because a wedged local state
/// would be worse than a stale remote one. The final offline write on
/// teardown may never land at all; the staleness sweep is the deliberate
/// compensating control for that gap.
#[derive(Debug)]
pub struct PresencePublisher {
    user_id: UserId,
    store: Arc<dyn DocumentStore>,
    heartbeat_period: Duration,
    state: SessionState,
    heartbeat: Option<HeartbeatHandle>,
}

impl PresencePublisher {
    /// Create a publisher for one user session, initially disconnected.
    pub fn new(user_id: UserId, store: Arc<dyn DocumentStore>, config: &PresenceConfig) -> Self {
        Self {
            user_id,
            store,
            heartbeat_period: Duration::from_secs(config.heartbeat_interval_seconds),
            state: SessionState::Disconnected,
            heartbeat: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a heartbeat timer is currently live.
    pub fn heartbeat_active(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Observe the store's connectivity signal.
    pub fn watch_connected(&self) -> tokio::sync::watch::Receiver<bool> {
        self.store.watch_connected()
    }

    /// Apply one external event to the state machine.
    ///
    /// Events with no legal transition from the current state are
    /// rejected with a debug log and no side effects.
    pub async fn handle(&mut self, event: SessionEvent) {
        match (self.state, event) {
            (SessionState::Disconnected, SessionEvent::Connected) => self.go_online().await,
            // The connectivity signal re-fires on reconnect; re-run the
            // online setup, which also restarts the heartbeat.
            (SessionState::Online, SessionEvent::Connected) => self.go_online().await,
            (SessionState::Online, SessionEvent::SurfaceVisible) => self.go_online().await,
            (SessionState::Online, SessionEvent::SurfaceHidden) => self.go_away().await,
            (SessionState::Away, SessionEvent::SurfaceVisible) => self.go_online().await,
            (SessionState::Online | SessionState::Away, SessionEvent::Teardown) => {
                self.go_offline(true).await
            }
            // Nothing was ever announced; end quietly.
            (SessionState::Disconnected, SessionEvent::Teardown) => self.go_offline(false).await,
            (state, event) => {
                debug!(?state, ?event, "event has no transition from current state");
            }
        }
    }

    async fn go_online(&mut self) {
        self.write_status(PresenceState::Online).await;
        heartbeat::push_activity(&self.store, &self.user_id).await;
        self.start_heartbeat();
        self.state = SessionState::Online;
    }

    async fn go_away(&mut self) {
        self.write_status(PresenceState::Away).await;
        self.stop_heartbeat();
        self.state = SessionState::Away;
    }

    async fn go_offline(&mut self, announce: bool) {
        // Stop the timer before the final write so a tick cannot race it.
        self.stop_heartbeat();
        if announce {
            self.write_status(PresenceState::Offline).await;
        }
        self.state = SessionState::Offline;
    }

    /// Replace the whole status document with the new state and a
    /// store-assigned timestamp.
    async fn write_status(&self, state: PresenceState) {
        let fields = DocumentFields::new()
            .set(presence::model::fields::STATE, state.as_str())
            .server_timestamp(presence::model::fields::LAST_CHANGED);
        if let Err(e) = self
            .store
            .upsert(presence::model::COLLECTION, &self.user_id.to_string(), fields)
            .await
        {
            warn!(user_id = %self.user_id, state = %state, error = %e, "status write failed");
        }
    }

    /// (Re)start the heartbeat, cancelling any prior timer first so at
    /// most one is ever live per session.
    fn start_heartbeat(&mut self) {
        if let Some(previous) = self.heartbeat.take() {
            previous.cancel();
        }
        self.heartbeat = Some(HeartbeatHandle::start(
            self.heartbeat_period,
            Arc::clone(&self.store),
            self.user_id,
        ));
    }

    fn stop_heartbeat(&mut self) {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presencehub_entity::user;
    use presencehub_store::MemoryDocumentStore;

    fn config() -> PresenceConfig {
        PresenceConfig {
            heartbeat_interval_seconds: 60,
        }
    }

    /// Store with a seeded profile record for the given user.
    async fn seeded_store(user_id: UserId) -> Arc<MemoryDocumentStore> {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .upsert(
                user::model::COLLECTION,
                &user_id.to_string(),
                DocumentFields::new().set("email", "test@example.com"),
            )
            .await
            .unwrap();
        store
    }

    fn publisher(user_id: UserId, store: &Arc<MemoryDocumentStore>) -> PresencePublisher {
        let store: Arc<dyn DocumentStore> = Arc::clone(store) as Arc<dyn DocumentStore>;
        PresencePublisher::new(user_id, store, &config())
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_connect_announces_once_and_schedules_heartbeat() {
        let user_id = UserId::new();
        let store = seeded_store(user_id).await;
        let mut publisher = publisher(user_id, &store);

        let before = store.write_ops();
        publisher.handle(SessionEvent::Connected).await;

        // Exactly one status upsert and one activity update.
        assert_eq!(store.write_ops() - before, 2);
        assert_eq!(publisher.state(), SessionState::Online);
        assert!(publisher.heartbeat_active());

        let status = store
            .get(presence::model::COLLECTION, &user_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status["state"], "online");
        assert!(status["lastChanged"].is_i64());

        let user = store
            .get(user::model::COLLECTION, &user_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(user["recentlyActive"].is_i64());

        // No early tick; the first heartbeat lands one period in.
        let before = store.write_ops();
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(store.write_ops() - before, 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.write_ops() - before, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_visibility_cycling_leaves_one_heartbeat() {
        let user_id = UserId::new();
        let store = seeded_store(user_id).await;
        let mut publisher = publisher(user_id, &store);

        publisher.handle(SessionEvent::Connected).await;
        for _ in 0..2 {
            publisher.handle(SessionEvent::SurfaceHidden).await;
            publisher.handle(SessionEvent::SurfaceVisible).await;
        }
        assert!(publisher.heartbeat_active());

        // One period passes: exactly one heartbeat write, not three.
        let before = store.write_ops();
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(store.write_ops() - before, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_surface_goes_away_and_stops_heartbeat() {
        let user_id = UserId::new();
        let store = seeded_store(user_id).await;
        let mut publisher = publisher(user_id, &store);

        publisher.handle(SessionEvent::Connected).await;
        publisher.handle(SessionEvent::SurfaceHidden).await;

        assert_eq!(publisher.state(), SessionState::Away);
        assert!(!publisher.heartbeat_active());

        let status = store
            .get(presence::model::COLLECTION, &user_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status["state"], "away");

        // A cancelled timer writes nothing.
        let before = store.write_ops();
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(store.write_ops() - before, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_announces_offline_and_is_terminal() {
        let user_id = UserId::new();
        let store = seeded_store(user_id).await;
        let mut publisher = publisher(user_id, &store);

        publisher.handle(SessionEvent::Connected).await;
        publisher.handle(SessionEvent::Teardown).await;

        assert_eq!(publisher.state(), SessionState::Offline);
        assert!(!publisher.heartbeat_active());

        let status = store
            .get(presence::model::COLLECTION, &user_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status["state"], "offline");

        // Terminal: later events change nothing.
        let before = store.write_ops();
        publisher.handle(SessionEvent::Connected).await;
        publisher.handle(SessionEvent::SurfaceVisible).await;
        assert_eq!(store.write_ops() - before, 0);
        assert_eq!(publisher.state(), SessionState::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn surface_events_before_connect_are_rejected() {
        let user_id = UserId::new();
        let store = seeded_store(user_id).await;
        let mut publisher = publisher(user_id, &store);

        let before = store.write_ops();
        publisher.handle(SessionEvent::SurfaceVisible).await;
        publisher.handle(SessionEvent::SurfaceHidden).await;

        assert_eq!(store.write_ops() - before, 0);
        assert_eq!(publisher.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_without_connect_writes_nothing() {
        let user_id = UserId::new();
        let store = seeded_store(user_id).await;
        let mut publisher = publisher(user_id, &store);

        let before = store.write_ops();
        publisher.handle(SessionEvent::Teardown).await;

        assert_eq!(store.write_ops() - before, 0);
        assert_eq!(publisher.state(), SessionState::Offline);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failures_do_not_wedge_the_machine() {
        let user_id = UserId::new();
        // No seeded profile: activity updates fail with not-found.
        let store = Arc::new(MemoryDocumentStore::new());
        let mut publisher = publisher(user_id, &store);

        publisher.handle(SessionEvent::Connected).await;

        // The status upsert still landed and the machine advanced.
        assert_eq!(publisher.state(), SessionState::Online);
        let status = store
            .get(presence::model::COLLECTION, &user_id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status["state"], "online");
    }
}
