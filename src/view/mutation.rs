//! Mutation feed reported by the storage layer

use serde::{Deserialize, Serialize};

use super::record::RecordId;

/// One storage change, reported after the storage write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// A new record
    Insert { id: RecordId },
    /// An existing record changed. Both flags false means "touched".
    Update {
        id: RecordId,
        object_changed: bool,
        metadata_changed: bool,
    },
    Remove { id: RecordId },
    /// Every record of one collection was removed
    RemoveCollection { collection: String },
    /// Every record was removed
    RemoveAll,
}

impl Mutation {
    pub fn insert(id: RecordId) -> Self {
        Mutation::Insert { id }
    }

    pub fn update(id: RecordId, object_changed: bool, metadata_changed: bool) -> Self {
        Mutation::Update {
            id,
            object_changed,
            metadata_changed,
        }
    }

    pub fn update_object(id: RecordId) -> Self {
        Self::update(id, true, false)
    }

    pub fn update_metadata(id: RecordId) -> Self {
        Self::update(id, false, true)
    }

    pub fn touch(id: RecordId) -> Self {
        Self::update(id, false, false)
    }

    pub fn remove(id: RecordId) -> Self {
        Mutation::Remove { id }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Insert { .. } => "insert",
            Mutation::Update {
                object_changed: false,
                metadata_changed: false,
                ..
            } => "touch",
            Mutation::Update { .. } => "update",
            Mutation::Remove { .. } => "remove",
            Mutation::RemoveCollection { .. } => "remove_collection",
            Mutation::RemoveAll => "remove_all",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind() {
        let id = RecordId::new("c", "k");
        assert_eq!(Mutation::insert(id.clone()).kind(), "insert");
        assert_eq!(Mutation::touch(id.clone()).kind(), "touch");
        assert_eq!(Mutation::update_object(id.clone()).kind(), "update");
        assert_eq!(Mutation::remove(id).kind(), "remove");
        assert_eq!(Mutation::RemoveAll.kind(), "remove_all");
    }

    #[test]
    fn test_feed_from_json() {
        let feed: Vec<Mutation> = serde_json::from_str(
            r#"[
                {"op": "insert", "id": {"collection": "posts", "key": "1"}},
                {"op": "update", "id": {"collection": "posts", "key": "1"},
                 "object_changed": false, "metadata_changed": true},
                {"op": "remove_collection", "collection": "posts"}
            ]"#,
        )
        .unwrap();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[1], Mutation::update_metadata(RecordId::new("posts", "1")));
    }
}
