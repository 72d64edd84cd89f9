//! External signals that drive the presence state machine.

/// An event observed by the hosting surface and fed to the publisher.
///
/// These signals are lossy by nature: a killed process emits nothing,
/// and a teardown event may arrive after the last chance to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A live connection to the status store was observed.
    Connected,
    /// The hosting surface became visible/foregrounded.
    SurfaceVisible,
    /// The hosting surface became hidden/backgrounded.
    SurfaceHidden,
    /// The session is ending (surface unload or host shutdown).
    Teardown,
}
