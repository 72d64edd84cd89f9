//! # presencehub-worker
//!
//! The server-resident half of presence tracking: a scheduled, idempotent
//! sweep that demotes `online` claims whose status document has not been
//! refreshed within the staleness window, compensating for clients that
//! died without announcing their own departure.

pub mod scheduler;
pub mod sweep;

pub use scheduler::SweepScheduler;
pub use sweep::{StalenessSweep, SweepReport};
