//! Record identity and the storage collaborator seam
//!
//! The view never stores payloads. It keeps `RecordId`s and reads objects and
//! metadata through `RecordSource` when a user function declares it needs them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{ViewError, ViewResult};

/// Identity of a record: a key unique within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    collection: String,
    key: String,
}

impl RecordId {
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

/// Borrowed view of a full record, handed to `Row` shaped functions.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub id: &'a RecordId,
    pub object: &'a Value,
    pub metadata: Option<&'a Value>,
}

/// Read access to the storage engine, scoped to the enclosing transaction.
///
/// Implementations must reflect the mutation being applied: the view is
/// updated AFTER the storage write, so `object` already returns the new value.
pub trait RecordSource {
    /// The record's object, or None if the record does not exist
    fn object(&self, id: &RecordId) -> Option<&Value>;

    /// The record's metadata (absent metadata and absent record both yield None)
    fn metadata(&self, id: &RecordId) -> Option<&Value>;

    /// Every live record, in a deterministic order. Used for initial population.
    fn record_ids(&self) -> Vec<RecordId>;

    /// Whether the record exists
    fn contains(&self, id: &RecordId) -> bool {
        self.object(id).is_some()
    }

    /// The full row, or None if the record does not exist
    fn row<'a>(&'a self, id: &'a RecordId) -> Option<Row<'a>> {
        let object = self.object(id)?;
        Some(Row {
            id,
            object,
            metadata: self.metadata(id),
        })
    }
}

/// Fetch an object the feed or the index says must exist.
pub(crate) fn require_object<'a, S: RecordSource + ?Sized>(
    source: &'a S,
    id: &RecordId,
) -> ViewResult<&'a Value> {
    source
        .object(id)
        .ok_or_else(|| ViewError::source_inconsistent(id, "object missing from record source"))
}

/// Fetch a full row the feed or the index says must exist.
pub(crate) fn require_row<'a, S: RecordSource + ?Sized>(
    source: &'a S,
    id: &'a RecordId,
) -> ViewResult<Row<'a>> {
    source
        .row(id)
        .ok_or_else(|| ViewError::source_inconsistent(id, "row missing from record source"))
}
