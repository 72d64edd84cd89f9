//! The document store trait both presence components write through.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

use presencehub_core::result::AppResult;

use crate::types::{Cursor, DocumentFields, Filter, OrderBy, QueryPage, WriteBatch};

/// A key-document store with last-write-wins semantics per document.
///
/// Documents are JSON objects addressed by `(collection, key)`. Writes to
/// one document are totally ordered by the store; no ordering holds across
/// documents. Timestamps the store must be able to trust are written via
/// the [`FieldValue::ServerTimestamp`](crate::types::FieldValue) sentinel
/// and resolved against the store's own clock.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug + 'static {
    /// Get a document. Returns `None` if it does not exist.
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>>;

    /// Create or replace a whole document.
    async fn upsert(&self, collection: &str, key: &str, fields: DocumentFields) -> AppResult<()>;

    /// Merge fields into an existing document. Fails with a not-found
    /// error if the document is absent.
    async fn update(&self, collection: &str, key: &str, fields: DocumentFields) -> AppResult<()>;

    /// Query a collection.
    ///
    /// Results are in key order unless `order_by` is given. `cursor`
    /// continues a prior key-ordered page and cannot be combined with
    /// `order_by`.
    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order_by: Option<OrderBy>,
        limit: Option<usize>,
        cursor: Option<Cursor>,
    ) -> AppResult<QueryPage>;

    /// Apply a batch of writes as one all-or-nothing unit.
    ///
    /// A concurrent reader observes either none or all of the batch;
    /// atomicity does not extend across separate batches.
    async fn commit(&self, batch: WriteBatch) -> AppResult<()>;

    /// The connectivity/liveness signal: `true` while this client holds a
    /// live connection to the store. Observers see the current value
    /// immediately and every change thereafter.
    fn watch_connected(&self) -> watch::Receiver<bool>;

    /// Check that the store backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
