//! Session event loop: wires the external signals into the publisher.

use tokio::sync::mpsc;
use tracing::debug;

use crate::events::SessionEvent;
use crate::publisher::PresencePublisher;

/// Drives one publisher from the host's event sources.
///
/// Events are handled one at a time in arrival order on a single task,
/// which is the only concurrency discipline the state machine needs.
pub struct PresenceSession;

impl PresenceSession {
    /// Run until the event channel closes (which counts as teardown).
    ///
    /// The store's connectivity watch is folded into the event stream:
    /// every rising edge becomes a [`SessionEvent::Connected`].
    pub async fn run(mut publisher: PresencePublisher, mut events: mpsc::Receiver<SessionEvent>) {
        let mut connected = publisher.watch_connected();

        // The store may already be connected when the session starts.
        if *connected.borrow_and_update() {
            publisher.handle(SessionEvent::Connected).await;
        }

        loop {
            tokio::select! {
                changed = connected.changed() => {
                    match changed {
                        Ok(()) => {
                            if *connected.borrow_and_update() {
                                publisher.handle(SessionEvent::Connected).await;
                            }
                        }
                        // The store dropped its signal; nothing further
                        // can be observed or written.
                        Err(_) => {
                            publisher.handle(SessionEvent::Teardown).await;
                            break;
                        }
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(SessionEvent::Teardown) | None => {
                            publisher.handle(SessionEvent::Teardown).await;
                            break;
                        }
                        Some(event) => publisher.handle(event).await,
                    }
                }
            }
        }

        debug!("presence session ended");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use presencehub_core::config::presence::PresenceConfig;
    use presencehub_core::types::UserId;
    use presencehub_entity::{presence, user};
    use presencehub_store::{DocumentFields, DocumentStore, MemoryDocumentStore};

    async fn status_state(store: &MemoryDocumentStore, user_id: &UserId) -> String {
        store
            .get(presence::model::COLLECTION, &user_id.to_string())
            .await
            .unwrap()
            .unwrap()["state"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn session_follows_connectivity_and_events() {
        let user_id = UserId::new();
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .upsert(
                user::model::COLLECTION,
                &user_id.to_string(),
                DocumentFields::new().set("email", "test@example.com"),
            )
            .await
            .unwrap();
        store.set_connected(false);

        let publisher = PresencePublisher::new(
            user_id,
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            &PresenceConfig::default(),
        );
        let (tx, rx) = mpsc::channel(8);
        let session = tokio::spawn(PresenceSession::run(publisher, rx));

        // Nothing announced while disconnected.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store
            .get(presence::model::COLLECTION, &user_id.to_string())
            .await
            .unwrap()
            .is_none());

        // Connectivity rising edge announces online.
        store.set_connected(true);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(status_state(&store, &user_id).await, "online");

        // Surface events flow through.
        tx.send(SessionEvent::SurfaceHidden).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(status_state(&store, &user_id).await, "away");

        // Closing the event source tears the session down.
        drop(tx);
        session.await.unwrap();
        assert_eq!(status_state(&store, &user_id).await, "offline");
    }
}
