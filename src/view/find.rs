//! Find functions for range lookups
//!
//! A find function classifies one record against a target range: before it,
//! within it, or after it. It must "sort" the same way the view's sorting does,
//! otherwise the located range is meaningless. For example, in a view sorted by
//! ascending timestamp, "timestamp in [t0, t1)" is expressed as
//! `Before` when ts < t0, `After` when ts >= t1 and `Within` otherwise.

use std::fmt;

use serde_json::Value;

use super::block_type::BlockType;
use super::errors::ViewResult;
use super::record::{require_object, require_row, RecordId, RecordSource, Row};

/// Where a record lies relative to the sought range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangePosition {
    /// The record sorts before the range
    Before,
    /// The record is inside the range
    Within,
    /// The record sorts after the range
    After,
}

type KeyFn = dyn Fn(&RecordId) -> RangePosition + Send + Sync;
type ObjectFn = dyn Fn(&RecordId, &Value) -> RangePosition + Send + Sync;
type MetadataFn = dyn Fn(&RecordId, Option<&Value>) -> RangePosition + Send + Sync;
type RowFn = dyn for<'a> Fn(&Row<'a>) -> RangePosition + Send + Sync;

pub enum ViewFind {
    ByKey(Box<KeyFn>),
    ByObject(Box<ObjectFn>),
    ByMetadata(Box<MetadataFn>),
    ByRow(Box<RowFn>),
}

impl ViewFind {
    pub fn by_key<F>(f: F) -> Self
    where
        F: Fn(&RecordId) -> RangePosition + Send + Sync + 'static,
    {
        ViewFind::ByKey(Box::new(f))
    }

    pub fn by_object<F>(f: F) -> Self
    where
        F: Fn(&RecordId, &Value) -> RangePosition + Send + Sync + 'static,
    {
        ViewFind::ByObject(Box::new(f))
    }

    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(&RecordId, Option<&Value>) -> RangePosition + Send + Sync + 'static,
    {
        ViewFind::ByMetadata(Box::new(f))
    }

    pub fn by_row<F>(f: F) -> Self
    where
        F: for<'a> Fn(&Row<'a>) -> RangePosition + Send + Sync + 'static,
    {
        ViewFind::ByRow(Box::new(f))
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            ViewFind::ByKey(_) => BlockType::Key,
            ViewFind::ByObject(_) => BlockType::Object,
            ViewFind::ByMetadata(_) => BlockType::Metadata,
            ViewFind::ByRow(_) => BlockType::Row,
        }
    }

    pub fn locate<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        id: &RecordId,
    ) -> ViewResult<RangePosition> {
        let position = match self {
            ViewFind::ByKey(f) => f(id),
            ViewFind::ByObject(f) => f(id, require_object(source, id)?),
            ViewFind::ByMetadata(f) => f(id, source.metadata(id)),
            ViewFind::ByRow(f) => f(&require_row(source, id)?),
        };
        Ok(position)
    }
}

impl fmt::Debug for ViewFind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewFind").field(&self.block_type()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::MemoryStore;
    use serde_json::json;

    fn between(lo: i64, hi: i64) -> ViewFind {
        ViewFind::by_object(move |_, obj| match obj.as_i64() {
            Some(v) if v < lo => RangePosition::Before,
            Some(v) if v >= hi => RangePosition::After,
            _ => RangePosition::Within,
        })
    }

    #[test]
    fn test_locate_object() {
        let mut store = MemoryStore::new();
        for (key, value) in [("a", 1), ("b", 5), ("c", 9)] {
            store.set(RecordId::new("n", key), json!(value), None);
        }
        let find = between(3, 8);
        let locate = |key: &str| find.locate(&store, &RecordId::new("n", key)).unwrap();
        assert_eq!(locate("a"), RangePosition::Before);
        assert_eq!(locate("b"), RangePosition::Within);
        assert_eq!(locate("c"), RangePosition::After);
    }

    #[test]
    fn test_locate_key_without_source_access() {
        let store = MemoryStore::new();
        let find = ViewFind::by_key(|id| {
            if id.key().starts_with('m') {
                RangePosition::Within
            } else if id.key() < "m" {
                RangePosition::Before
            } else {
                RangePosition::After
            }
        });
        let pos = find.locate(&store, &RecordId::new("n", "mango")).unwrap();
        assert_eq!(pos, RangePosition::Within);
        assert_eq!(find.block_type(), BlockType::Key);
    }
}
