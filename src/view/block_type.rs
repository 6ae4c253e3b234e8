//! Capability tags for user-supplied view functions
//!
//! Every grouping, sorting and find function declares which record fields it
//! reads. Collection and key are always available. The maintainer uses the tag
//! to skip work an update cannot influence.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which record fields a view function reads, besides collection and key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// Collection and key only
    Key,
    /// Object payload
    Object,
    /// Metadata payload
    Metadata,
    /// Object and metadata
    Row,
}

impl BlockType {
    /// Whether the function needs the object payload
    pub fn needs_object(&self) -> bool {
        matches!(self, BlockType::Object | BlockType::Row)
    }

    /// Whether the function needs the metadata payload
    pub fn needs_metadata(&self) -> bool {
        matches!(self, BlockType::Metadata | BlockType::Row)
    }

    /// Whether a change to the given payloads can alter this function's result.
    ///
    /// Keys never change for a record, so a key-only function is never affected.
    pub fn affected_by(&self, object_changed: bool, metadata_changed: bool) -> bool {
        (object_changed && self.needs_object()) || (metadata_changed && self.needs_metadata())
    }

    /// Whether every field `other` reads is also read by `self`.
    pub fn covers(&self, other: BlockType) -> bool {
        (!other.needs_object() || self.needs_object())
            && (!other.needs_metadata() || self.needs_metadata())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Key => "key",
            BlockType::Object => "object",
            BlockType::Metadata => "metadata",
            BlockType::Row => "row",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
