//! In-memory document store backend.
//!
//! Collections are dashmap-sharded; each collection is an ordered map
//! behind its own `RwLock` so that a batch commit can hold every involved
//! collection exclusively and stay all-or-nothing relative to readers.
//! Locks are always taken in collection-name order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use presencehub_core::error::AppError;
use presencehub_core::result::AppResult;

use crate::store::DocumentStore;
use crate::types::{
    Cursor, DocumentFields, FieldValue, Filter, FilterField, FilterOp, FilterValue, OrderBy,
    QueryPage, WriteBatch, WriteKind, WriteOp,
};

type Collection = Arc<RwLock<BTreeMap<String, Value>>>;

/// In-memory document store.
///
/// Single-node stand-in for the external document database: last write
/// wins per document, server timestamps resolved against the local clock
/// and clamped non-decreasing per field, and a connectivity watch channel
/// standing in for the backend's liveness signal.
pub struct MemoryDocumentStore {
    /// Collection name → ordered documents.
    collections: DashMap<String, Collection>,
    /// Connectivity signal. Starts connected; hosts and tests flip it
    /// via [`set_connected`](Self::set_connected).
    connected: watch::Sender<bool>,
    /// Total applied write ops, for observability.
    write_ops: AtomicU64,
}

impl std::fmt::Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocumentStore")
            .field("collections", &self.collections.len())
            .finish()
    }
}

impl MemoryDocumentStore {
    /// Create an empty store, initially connected.
    pub fn new() -> Self {
        let (connected, _) = watch::channel(true);
        Self {
            collections: DashMap::new(),
            connected,
            write_ops: AtomicU64::new(0),
        }
    }

    /// Flip the connectivity signal observed via
    /// [`DocumentStore::watch_connected`].
    pub fn set_connected(&self, connected: bool) {
        let previous = self.connected.send_replace(connected);
        if previous != connected {
            debug!(connected, "store connectivity changed");
        }
    }

    /// Total number of write ops applied so far.
    pub fn write_ops(&self) -> u64 {
        self.write_ops.load(AtomicOrdering::Relaxed)
    }

    /// Get or create the named collection.
    fn collection(&self, name: &str) -> Collection {
        let entry = self.collections.entry(name.to_string()).or_default();
        Arc::clone(&entry)
    }

    /// Get the named collection without creating it.
    fn existing_collection(&self, name: &str) -> Option<Collection> {
        self.collections.get(name).map(|c| Arc::clone(c.value()))
    }

    fn read_guard(collection: &Collection) -> AppResult<RwLockReadGuard<'_, BTreeMap<String, Value>>> {
        collection
            .read()
            .map_err(|_| AppError::internal("store lock poisoned"))
    }

    fn write_guard(collection: &Collection) -> AppResult<RwLockWriteGuard<'_, BTreeMap<String, Value>>> {
        collection
            .write()
            .map_err(|_| AppError::internal("store lock poisoned"))
    }

    /// Resolve one field value, clamping server timestamps so a document
    /// field never moves backwards.
    fn resolve_value(existing: Option<&Value>, name: &str, value: &FieldValue, now_ms: i64) -> Value {
        match value {
            FieldValue::Json(v) => v.clone(),
            FieldValue::ServerTimestamp => {
                let previous = existing
                    .and_then(|doc| doc.get(name))
                    .and_then(Value::as_i64)
                    .unwrap_or(i64::MIN);
                Value::from(now_ms.max(previous))
            }
        }
    }

    /// Build the replacement document for an upsert.
    fn resolve_document(existing: Option<&Value>, fields: &DocumentFields, now_ms: i64) -> Value {
        let mut object = serde_json::Map::new();
        for (name, value) in fields.iter() {
            object.insert(name.to_string(), Self::resolve_value(existing, name, value, now_ms));
        }
        Value::Object(object)
    }

    /// Merge fields into an existing document.
    fn merge_document(doc: &mut Value, fields: &DocumentFields, now_ms: i64) {
        let previous = doc.clone();
        if let Value::Object(object) = doc {
            for (name, value) in fields.iter() {
                object.insert(
                    name.to_string(),
                    Self::resolve_value(Some(&previous), name, value, now_ms),
                );
            }
        }
    }

    fn apply_op(map: &mut BTreeMap<String, Value>, op: &WriteOp, now_ms: i64) {
        match &op.kind {
            WriteKind::Upsert(fields) => {
                let doc = Self::resolve_document(map.get(&op.key), fields, now_ms);
                map.insert(op.key.clone(), doc);
            }
            WriteKind::Update(fields) => {
                // Existence was validated before any op of the batch applied.
                if let Some(doc) = map.get_mut(&op.key) {
                    Self::merge_document(doc, fields, now_ms);
                }
            }
        }
    }

    fn matches_filter(doc: &Value, filter: &Filter) -> bool {
        filter
            .conditions()
            .iter()
            .all(|condition| Self::matches_condition(doc, condition))
    }

    /// Evaluate one condition. An absent field only matches `Eq Null`;
    /// a type mismatch between the field and the filter value never
    /// matches.
    fn matches_condition(doc: &Value, condition: &FilterField) -> bool {
        let field = doc.get(&condition.field);
        match (&condition.value, field) {
            (FilterValue::Null, None) => matches!(condition.op, FilterOp::Eq),
            (FilterValue::Null, Some(actual)) => match condition.op {
                FilterOp::Eq => actual.is_null(),
                FilterOp::Ne => !actual.is_null(),
                _ => false,
            },
            (_, None) => false,
            (expected, Some(actual)) => {
                let Some(ordering) = Self::compare(actual, expected) else {
                    return false;
                };
                match condition.op {
                    FilterOp::Eq => ordering == Ordering::Equal,
                    FilterOp::Ne => ordering != Ordering::Equal,
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Gte => ordering != Ordering::Less,
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Lte => ordering != Ordering::Greater,
                }
            }
        }
    }

    fn compare(actual: &Value, expected: &FilterValue) -> Option<Ordering> {
        match expected {
            FilterValue::String(s) => actual.as_str().map(|a| a.cmp(s.as_str())),
            FilterValue::Integer(i) => actual.as_i64().map(|a| a.cmp(i)),
            FilterValue::Float(f) => actual.as_f64().and_then(|a| a.partial_cmp(f)),
            FilterValue::Boolean(b) => actual.as_bool().map(|a| a.cmp(b)),
            FilterValue::Null => None,
        }
    }

    fn cmp_order_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => match (a, b) {
                (Value::Number(x), Value::Number(y)) => x
                    .as_f64()
                    .partial_cmp(&y.as_f64())
                    .unwrap_or(Ordering::Equal),
                (Value::String(x), Value::String(y)) => x.cmp(y),
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                _ => Ordering::Equal,
            },
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> AppResult<Option<Value>> {
        let Some(handle) = self.existing_collection(collection) else {
            return Ok(None);
        };
        let map = Self::read_guard(&handle)?;
        Ok(map.get(key).cloned())
    }

    async fn upsert(&self, collection: &str, key: &str, fields: DocumentFields) -> AppResult<()> {
        let handle = self.collection(collection);
        let mut map = Self::write_guard(&handle)?;
        let doc = Self::resolve_document(map.get(key), &fields, Utc::now().timestamp_millis());
        map.insert(key.to_string(), doc);
        drop(map);
        self.write_ops.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: DocumentFields) -> AppResult<()> {
        let Some(handle) = self.existing_collection(collection) else {
            return Err(AppError::not_found(format!(
                "Document {collection}/{key} does not exist"
            )));
        };
        let mut map = Self::write_guard(&handle)?;
        let Some(doc) = map.get_mut(key) else {
            return Err(AppError::not_found(format!(
                "Document {collection}/{key} does not exist"
            )));
        };
        Self::merge_document(doc, &fields, Utc::now().timestamp_millis());
        drop(map);
        self.write_ops.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        order_by: Option<OrderBy>,
        limit: Option<usize>,
        cursor: Option<Cursor>,
    ) -> AppResult<QueryPage> {
        if order_by.is_some() && cursor.is_some() {
            return Err(AppError::validation(
                "cursor pagination requires key ordering",
            ));
        }

        let Some(handle) = self.existing_collection(collection) else {
            return Ok(QueryPage::empty());
        };
        let map = Self::read_guard(&handle)?;

        if let Some(order) = order_by {
            let mut docs: Vec<(String, Value)> = map
                .iter()
                .filter(|(_, doc)| Self::matches_filter(doc, filter))
                .map(|(key, doc)| (key.clone(), doc.clone()))
                .collect();
            docs.sort_by(|(_, a), (_, b)| {
                let ordering = Self::cmp_order_field(a.get(&order.field), b.get(&order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
            if let Some(limit) = limit {
                docs.truncate(limit);
            }
            return Ok(QueryPage {
                docs,
                next_cursor: None,
            });
        }

        let lower = match &cursor {
            Some(cursor) => Bound::Excluded(cursor.position().to_string()),
            None => Bound::Unbounded,
        };

        let mut docs: Vec<(String, Value)> = Vec::new();
        let mut next_cursor = None;
        for (key, doc) in map.range((lower, Bound::Unbounded)) {
            if !Self::matches_filter(doc, filter) {
                continue;
            }
            if let Some(limit) = limit {
                if docs.len() == limit {
                    next_cursor = docs.last().map(|(key, _)| Cursor::new(key.clone()));
                    break;
                }
            }
            docs.push((key.clone(), doc.clone()));
        }

        Ok(QueryPage { docs, next_cursor })
    }

    async fn commit(&self, batch: WriteBatch) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut names: Vec<String> = batch.ops().iter().map(|op| op.collection.clone()).collect();
        names.sort();
        names.dedup();

        let handles: Vec<(String, Collection)> = names
            .into_iter()
            .map(|name| {
                let handle = self.collection(&name);
                (name, handle)
            })
            .collect();

        let mut guards: Vec<(&str, RwLockWriteGuard<'_, BTreeMap<String, Value>>)> =
            Vec::with_capacity(handles.len());
        for (name, handle) in &handles {
            guards.push((name.as_str(), Self::write_guard(handle)?));
        }

        // Validate before applying so the batch stays all-or-nothing.
        for op in batch.ops() {
            if let WriteKind::Update(_) = &op.kind {
                let Some((_, map)) = guards.iter().find(|(name, _)| *name == op.collection) else {
                    return Err(AppError::internal("batch collection guard missing"));
                };
                if !map.contains_key(&op.key) {
                    return Err(AppError::not_found(format!(
                        "Document {}/{} does not exist",
                        op.collection, op.key
                    )));
                }
            }
        }

        let now_ms = Utc::now().timestamp_millis();
        for op in batch.ops() {
            let Some((_, map)) = guards.iter_mut().find(|(name, _)| *name == op.collection) else {
                return Err(AppError::internal("batch collection guard missing"));
            };
            Self::apply_op(map, op, now_ms);
            self.write_ops.fetch_add(1, AtomicOrdering::Relaxed);
        }

        Ok(())
    }

    fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presencehub_core::error::ErrorKind;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_and_get() {
        let store = MemoryDocumentStore::new();
        store
            .upsert("status", "u1", DocumentFields::new().set("state", "online"))
            .await
            .unwrap();
        let doc = store.get("status", "u1").await.unwrap().unwrap();
        assert_eq!(doc["state"], "online");
    }

    #[tokio::test]
    async fn upsert_replaces_whole_document() {
        let store = MemoryDocumentStore::new();
        store
            .upsert("status", "u1", DocumentFields::new().set("state", "online").set("extra", 1))
            .await
            .unwrap();
        store
            .upsert("status", "u1", DocumentFields::new().set("state", "away"))
            .await
            .unwrap();
        let doc = store.get("status", "u1").await.unwrap().unwrap();
        assert_eq!(doc["state"], "away");
        assert!(doc.get("extra").is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryDocumentStore::new();
        store
            .upsert("users", "u1", DocumentFields::new().set("email", "a@b.c"))
            .await
            .unwrap();
        store
            .update("users", "u1", DocumentFields::new().set("recentlyActive", 123))
            .await
            .unwrap();
        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc["email"], "a@b.c");
        assert_eq!(doc["recentlyActive"], 123);
    }

    #[tokio::test]
    async fn update_absent_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("users", "missing", DocumentFields::new().set("x", 1))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn server_timestamp_is_resolved_and_clamped() {
        let store = MemoryDocumentStore::new();
        let future_ms = Utc::now().timestamp_millis() + 3_600_000;
        store
            .upsert("status", "u1", DocumentFields::new().set("lastChanged", future_ms))
            .await
            .unwrap();
        store
            .update("status", "u1", DocumentFields::new().server_timestamp("lastChanged"))
            .await
            .unwrap();
        let doc = store.get("status", "u1").await.unwrap().unwrap();
        // Never moves backwards, even against a perturbed stored value.
        assert_eq!(doc["lastChanged"].as_i64().unwrap(), future_ms);

        store
            .upsert("status", "u2", DocumentFields::new().server_timestamp("lastChanged"))
            .await
            .unwrap();
        let doc = store.get("status", "u2").await.unwrap().unwrap();
        let resolved = doc["lastChanged"].as_i64().unwrap();
        assert!((resolved - Utc::now().timestamp_millis()).abs() < 5_000);
    }

    #[tokio::test]
    async fn query_filters_and_paginates_in_key_order() {
        let store = MemoryDocumentStore::new();
        for (key, state, changed) in [
            ("a", "online", 100),
            ("b", "offline", 100),
            ("c", "online", 300),
            ("d", "online", 100),
        ] {
            store
                .upsert(
                    "status",
                    key,
                    DocumentFields::new().set("state", state).set("lastChanged", changed),
                )
                .await
                .unwrap();
        }

        let filter = Filter::new()
            .with(FilterField::eq("state", "online"))
            .with(FilterField::new(
                "lastChanged",
                FilterOp::Lt,
                FilterValue::Integer(200),
            ));

        let page = store
            .query("status", &filter, None, Some(1), None)
            .await
            .unwrap();
        assert_eq!(page.docs.len(), 1);
        assert_eq!(page.docs[0].0, "a");
        let cursor = page.next_cursor.expect("more matches remain");

        let page = store
            .query("status", &filter, None, Some(1), Some(cursor))
            .await
            .unwrap();
        assert_eq!(page.docs.len(), 1);
        assert_eq!(page.docs[0].0, "d");
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn query_orders_by_field() {
        let store = MemoryDocumentStore::new();
        for (key, changed) in [("a", 300), ("b", 100), ("c", 200)] {
            store
                .upsert("status", key, DocumentFields::new().set("lastChanged", changed))
                .await
                .unwrap();
        }
        let page = store
            .query(
                "status",
                &Filter::new(),
                Some(OrderBy::desc("lastChanged")),
                None,
                None,
            )
            .await
            .unwrap();
        let keys: Vec<&str> = page.docs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "c", "b"]);
    }

    #[tokio::test]
    async fn query_rejects_cursor_with_order_by() {
        let store = MemoryDocumentStore::new();
        store
            .upsert("status", "a", DocumentFields::new().set("x", 1))
            .await
            .unwrap();
        let page = store
            .query("status", &Filter::new(), None, Some(1), None)
            .await
            .unwrap();
        // Single match, nothing beyond the page.
        assert!(page.next_cursor.is_none());

        let err = store
            .query(
                "status",
                &Filter::new(),
                Some(OrderBy::asc("x")),
                None,
                Some(Cursor::new("a")),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing() {
        let store = MemoryDocumentStore::new();
        store
            .upsert("status", "u1", DocumentFields::new().set("state", "online"))
            .await
            .unwrap();

        let before = store.write_ops();

        let mut batch = WriteBatch::new();
        batch.update("status", "u1", DocumentFields::new().set("state", "offline"));
        batch.update("users", "u1", DocumentFields::new().set("status", "offline"));

        let err = store.commit(batch).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        // The valid half of the failed batch did not apply.
        let doc = store.get("status", "u1").await.unwrap().unwrap();
        assert_eq!(doc["state"], "online");
        assert_eq!(store.write_ops(), before);
    }

    #[tokio::test]
    async fn commit_applies_across_collections() {
        let store = MemoryDocumentStore::new();
        store
            .upsert("status", "u1", DocumentFields::new().set("state", "online"))
            .await
            .unwrap();
        store
            .upsert("users", "u1", DocumentFields::new().set("email", json!("a@b.c")))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch.update(
            "status",
            "u1",
            DocumentFields::new().set("state", "offline").server_timestamp("lastChanged"),
        );
        batch.update("users", "u1", DocumentFields::new().set("status", "offline"));
        store.commit(batch).await.unwrap();

        let status = store.get("status", "u1").await.unwrap().unwrap();
        let user = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(status["state"], "offline");
        assert!(status["lastChanged"].is_i64());
        assert_eq!(user["status"], "offline");
    }

    #[tokio::test]
    async fn connectivity_watch_observes_changes() {
        let store = MemoryDocumentStore::new();
        let mut watch = store.watch_connected();
        assert!(*watch.borrow_and_update());

        store.set_connected(false);
        watch.changed().await.unwrap();
        assert!(!*watch.borrow_and_update());
    }
}
