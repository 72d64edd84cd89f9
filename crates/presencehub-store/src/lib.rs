//! # presencehub-store
//!
//! The document store collaborator: the [`DocumentStore`] trait both the
//! presence publisher and the staleness sweep write through, the
//! supporting filter/write-batch types, and an in-memory backend.
//!
//! The store owns time: writes carry a server-timestamp sentinel instead
//! of a client-supplied value wherever a trustworthy timestamp is needed.

pub mod memory;
pub mod store;
pub mod types;

pub use memory::MemoryDocumentStore;
pub use store::DocumentStore;
pub use types::{
    Cursor, DocumentFields, FieldValue, Filter, FilterField, FilterOp, FilterValue, OrderBy,
    QueryPage, WriteBatch, WriteKind, WriteOp,
};
