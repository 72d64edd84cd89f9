//! Write, filter, and pagination types for the document store contract.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A value written into a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A literal JSON value supplied by the caller.
    Json(Value),
    /// A sentinel the store resolves to its own clock at commit time.
    /// Resolved timestamps are epoch milliseconds, non-decreasing per
    /// document field.
    ServerTimestamp,
}

/// An ordered set of named fields for a single write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFields {
    fields: BTreeMap<String, FieldValue>,
}

impl DocumentFields {
    /// Create an empty field set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field to a literal value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), FieldValue::Json(value.into()));
        self
    }

    /// Set a field to the store-assigned timestamp sentinel.
    pub fn server_timestamp(mut self, name: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldValue::ServerTimestamp);
        self
    }

    /// Iterate over the fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the field set is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The kind of a single batched write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteKind {
    /// Create or replace the whole document.
    Upsert(DocumentFields),
    /// Merge fields into an existing document; fails if the document
    /// is absent.
    Update(DocumentFields),
}

/// A single write against one document.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    /// Target collection.
    pub collection: String,
    /// Target document key.
    pub key: String,
    /// The write to perform.
    pub kind: WriteKind,
}

/// A set of writes committed as one all-or-nothing unit.
///
/// Atomicity holds across every op in the batch; it does NOT extend
/// across separate batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a create-or-replace write to the batch.
    pub fn upsert(&mut self, collection: impl Into<String>, key: impl Into<String>, fields: DocumentFields) {
        self.ops.push(WriteOp {
            collection: collection.into(),
            key: key.into(),
            kind: WriteKind::Upsert(fields),
        });
    }

    /// Add a merge write to the batch.
    pub fn update(&mut self, collection: impl Into<String>, key: impl Into<String>, fields: DocumentFields) {
        self.ops.push(WriteOp {
            collection: collection.into(),
            key: key.into(),
            kind: WriteKind::Update(fields),
        });
    }

    /// The ops in insertion order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of ops in the batch.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch holds no ops.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

/// A dynamic filter value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A string value.
    String(String),
    /// An integer value.
    Integer(i64),
    /// A floating-point value.
    Float(f64),
    /// A boolean value.
    Boolean(bool),
    /// Null / absent field.
    Null,
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterField {
    /// The field name to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for a string equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Eq, FilterValue::String(value.into()))
    }
}

/// A conjunction of filter conditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    conditions: Vec<FilterField>,
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition; all conditions must hold for a document to match.
    pub fn with(mut self, condition: FilterField) -> Self {
        self.conditions.push(condition);
        self
    }

    /// The conditions in insertion order.
    pub fn conditions(&self) -> &[FilterField] {
        &self.conditions
    }

    /// Whether the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Sort directive for query results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBy {
    /// The field to sort on.
    pub field: String,
    /// Whether to sort descending.
    pub descending: bool,
}

impl OrderBy {
    /// Ascending sort on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    /// Descending sort on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Opaque continuation token for key-ordered pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub(crate) fn new(position: impl Into<String>) -> Self {
        Self(position.into())
    }

    pub(crate) fn position(&self) -> &str {
        &self.0
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Matching documents as `(key, document)` pairs.
    pub docs: Vec<(String, Value)>,
    /// Continuation token, present when more matches remain.
    pub next_cursor: Option<Cursor>,
}

impl QueryPage {
    /// An empty page with no continuation.
    pub fn empty() -> Self {
        Self::default()
    }
}
