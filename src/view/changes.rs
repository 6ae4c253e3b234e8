//! Structural change log
//!
//! Each write transaction records the structural changes it makes, in the
//! order it makes them. Indexes are positions at the moment of the change.
//! Delivering the log to observers is the caller's business.

use serde::Serialize;

use super::record::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewChange {
    /// A group gained its first member
    GroupInserted { group: String },
    /// A group lost its last member
    GroupDeleted { group: String },
    RowInserted {
        id: RecordId,
        group: String,
        index: usize,
    },
    RowDeleted {
        id: RecordId,
        group: String,
        index: usize,
    },
    /// Re-positioned within the same group
    RowMoved {
        id: RecordId,
        group: String,
        from: usize,
        to: usize,
    },
    /// Changed in place
    RowUpdated {
        id: RecordId,
        group: String,
        index: usize,
        object_changed: bool,
        metadata_changed: bool,
    },
}

impl ViewChange {
    pub fn group(&self) -> &str {
        match self {
            ViewChange::GroupInserted { group }
            | ViewChange::GroupDeleted { group }
            | ViewChange::RowInserted { group, .. }
            | ViewChange::RowDeleted { group, .. }
            | ViewChange::RowMoved { group, .. }
            | ViewChange::RowUpdated { group, .. } => group,
        }
    }

    pub fn record(&self) -> Option<&RecordId> {
        match self {
            ViewChange::GroupInserted { .. } | ViewChange::GroupDeleted { .. } => None,
            ViewChange::RowInserted { id, .. }
            | ViewChange::RowDeleted { id, .. }
            | ViewChange::RowMoved { id, .. }
            | ViewChange::RowUpdated { id, .. } => Some(id),
        }
    }
}
