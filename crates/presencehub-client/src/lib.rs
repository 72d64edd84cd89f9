//! # presencehub-client
//!
//! The client-resident half of presence tracking: a session-scoped state
//! machine that advertises this user's connectivity state through the
//! status store, plus the heartbeat that keeps the claim fresh.
//!
//! Presence is best-effort telemetry. Every store write here is logged
//! and swallowed on failure; the server-side staleness sweep compensates
//! for anything this side never got to say.

pub mod events;
pub mod heartbeat;
pub mod publisher;
pub mod session;

pub use events::SessionEvent;
pub use publisher::{PresencePublisher, SessionState};
pub use session::PresenceSession;
