//! Grouping functions
//!
//! A grouping both filters and partitions: returning `None` excludes the record
//! from the view, returning a label places it in that group. The empty string
//! is an ordinary group label.
//!
//! Pick the variant that reads the fewest fields. A key-only grouping is never
//! re-evaluated on update, an object grouping is skipped on metadata-only
//! updates, and so on.

use std::fmt;

use serde_json::Value;

use super::block_type::BlockType;
use super::errors::ViewResult;
use super::record::{require_object, require_row, RecordId, RecordSource, Row};

type KeyFn = dyn Fn(&RecordId) -> Option<String> + Send + Sync;
type ObjectFn = dyn Fn(&RecordId, &Value) -> Option<String> + Send + Sync;
type MetadataFn = dyn Fn(&RecordId, Option<&Value>) -> Option<String> + Send + Sync;
type RowFn = dyn for<'a> Fn(&Row<'a>) -> Option<String> + Send + Sync;

/// Maps a record to its group, or to no group.
///
/// Must be a pure function of its declared inputs.
pub enum ViewGrouping {
    ByKey(Box<KeyFn>),
    ByObject(Box<ObjectFn>),
    ByMetadata(Box<MetadataFn>),
    ByRow(Box<RowFn>),
}

impl ViewGrouping {
    pub fn by_key<F>(f: F) -> Self
    where
        F: Fn(&RecordId) -> Option<String> + Send + Sync + 'static,
    {
        ViewGrouping::ByKey(Box::new(f))
    }

    pub fn by_object<F>(f: F) -> Self
    where
        F: Fn(&RecordId, &Value) -> Option<String> + Send + Sync + 'static,
    {
        ViewGrouping::ByObject(Box::new(f))
    }

    pub fn by_metadata<F>(f: F) -> Self
    where
        F: Fn(&RecordId, Option<&Value>) -> Option<String> + Send + Sync + 'static,
    {
        ViewGrouping::ByMetadata(Box::new(f))
    }

    pub fn by_row<F>(f: F) -> Self
    where
        F: for<'a> Fn(&Row<'a>) -> Option<String> + Send + Sync + 'static,
    {
        ViewGrouping::ByRow(Box::new(f))
    }

    /// Every record lands in `group`.
    pub fn single(group: impl Into<String>) -> Self {
        let group = group.into();
        Self::by_key(move |_| Some(group.clone()))
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            ViewGrouping::ByKey(_) => BlockType::Key,
            ViewGrouping::ByObject(_) => BlockType::Object,
            ViewGrouping::ByMetadata(_) => BlockType::Metadata,
            ViewGrouping::ByRow(_) => BlockType::Row,
        }
    }

    /// Evaluate the grouping, reading only the declared fields from `source`.
    pub fn group<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        id: &RecordId,
    ) -> ViewResult<Option<String>> {
        let group = match self {
            ViewGrouping::ByKey(f) => f(id),
            ViewGrouping::ByObject(f) => f(id, require_object(source, id)?),
            ViewGrouping::ByMetadata(f) => f(id, source.metadata(id)),
            ViewGrouping::ByRow(f) => f(&require_row(source, id)?),
        };
        Ok(group)
    }
}

impl fmt::Debug for ViewGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewGrouping").field(&self.block_type()).finish()
    }
}
