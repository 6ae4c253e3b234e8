//! Sorting functions
//!
//! A sorting orders two records of the same group. It must define a total
//! order: transitive, antisymmetric and stable while inputs are unchanged.
//! Violations are not detected and leave the group in an undefined order.
//!
//! Ties: a record being placed goes after every record it compares `Equal` to.
//! An updated record is placed the same way, after the members it ties with.

use std::cmp::Ordering;
use std::fmt;

use serde_json::Value;

use super::block_type::BlockType;
use super::errors::ViewResult;
use super::record::{require_object, require_row, RecordId, RecordSource, Row};

type KeyFn = dyn Fn(&str, &RecordId, &RecordId) -> Ordering + Send + Sync;
type ObjectFn = dyn Fn(&str, &RecordId, &Value, &RecordId, &Value) -> Ordering + Send + Sync;
type MetadataFn =
    dyn Fn(&str, &RecordId, Option<&Value>, &RecordId, Option<&Value>) -> Ordering + Send + Sync;
type RowFn = dyn for<'a, 'b> Fn(&str, &Row<'a>, &Row<'b>) -> Ordering + Send + Sync;

/// Orders records within a group. The first argument is the group label.
pub enum ViewSorting {
    ByKey(Box<KeyFn>),
    ByObject(Box<ObjectFn>),
    ByMetadata(Box<MetadataFn>),
    ByRow(Box<RowFn>),
}

impl ViewSorting {
    pub fn by_key<F>(f: F) -> Self
    where
        F: Fn(&str, &RecordId, &RecordId) -> Ordering + Send + Sync + 'static,
    {
        ViewSorting::ByKey(Box::new(f))
    }

    pub fn by_object<F>(f: F) -> Self
    where
        F: Fn(&str, &RecordId, &Value, &RecordId, &Value) -> Ordering + Send + Sync + 'static,
    {
        ViewSorting::ByObject(Box::new(f))
    }

    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(&str, &RecordId, Option<&Value>, &RecordId, Option<&Value>) -> Ordering
            + Send
            + Sync
            + 'static,
    {
        ViewSorting::ByMetadata(Box::new(f))
    }

    pub fn by_row<F>(f: F) -> Self
    where
        F: for<'a, 'b> Fn(&str, &Row<'a>, &Row<'b>) -> Ordering + Send + Sync + 'static,
    {
        ViewSorting::ByRow(Box::new(f))
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            ViewSorting::ByKey(_) => BlockType::Key,
            ViewSorting::ByObject(_) => BlockType::Object,
            ViewSorting::ByMetadata(_) => BlockType::Metadata,
            ViewSorting::ByRow(_) => BlockType::Row,
        }
    }

    /// Compare `a` against `b` within `group`, reading only the declared fields.
    pub fn compare<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        group: &str,
        a: &RecordId,
        b: &RecordId,
    ) -> ViewResult<Ordering> {
        let ordering = match self {
            ViewSorting::ByKey(f) => f(group, a, b),
            ViewSorting::ByObject(f) => {
                f(group, a, require_object(source, a)?, b, require_object(source, b)?)
            }
            ViewSorting::ByMetadata(f) => f(group, a, source.metadata(a), b, source.metadata(b)),
            ViewSorting::ByRow(f) => f(group, &require_row(source, a)?, &require_row(source, b)?),
        };
        Ok(ordering)
    }
}

impl fmt::Debug for ViewSorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewSorting").field(&self.block_type()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::MemoryStore;
    use serde_json::json;

    fn store_with(values: &[(&str, i64)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (key, value) in values {
            store.set(RecordId::new("c", *key), json!(value), Some(json!(-value)));
        }
        store
    }

    #[test]
    fn test_key_sorting() {
        let store = MemoryStore::new();
        let sorting = ViewSorting::by_key(|_, a, b| a.key().cmp(b.key()));
        let ord = sorting
            .compare(&store, "g", &RecordId::new("c", "a"), &RecordId::new("c", "b"))
            .unwrap();
        assert_eq!(ord, Ordering::Less);
    }

    #[test]
    fn test_object_sorting() {
        let store = store_with(&[("x", 10), ("y", 2)]);
        let sorting = ViewSorting::by_object(|_, _, a, _, b| a.as_i64().cmp(&b.as_i64()));
        let ord = sorting
            .compare(&store, "g", &RecordId::new("c", "x"), &RecordId::new("c", "y"))
            .unwrap();
        assert_eq!(ord, Ordering::Greater);
    }

    #[test]
    fn test_metadata_sorting() {
        let store = store_with(&[("x", 10), ("y", 2)]);
        let sorting = ViewSorting::by_metadata(|_, _, a, _, b| {
            a.and_then(Value::as_i64).cmp(&b.and_then(Value::as_i64))
        });
        let ord = sorting
            .compare(&store, "g", &RecordId::new("c", "x"), &RecordId::new("c", "y"))
            .unwrap();
        assert_eq!(ord, Ordering::Less);
    }

    #[test]
    fn test_row_sorting_receives_group() {
        let store = store_with(&[("x", 1), ("y", 1)]);
        let sorting = ViewSorting::by_row(|group, a, b| {
            assert_eq!(group, "inbox");
            a.object.as_i64().cmp(&b.object.as_i64()).then(a.id.cmp(b.id))
        });
        let ord = sorting
            .compare(&store, "inbox", &RecordId::new("c", "x"), &RecordId::new("c", "y"))
            .unwrap();
        assert_eq!(ord, Ordering::Less);
    }

    #[test]
    fn test_missing_record_is_inconsistent() {
        let store = store_with(&[("x", 1)]);
        let sorting = ViewSorting::by_object(|_, _, a, _, b| a.as_i64().cmp(&b.as_i64()));
        let err = sorting
            .compare(&store, "g", &RecordId::new("c", "x"), &RecordId::new("c", "gone"))
            .unwrap_err();
        assert_eq!(err.code(), "AERO_VIEW_SOURCE_INCONSISTENT");
    }
}
