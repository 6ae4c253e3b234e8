//! In-memory record source
//!
//! A minimal key-value store that reports, for each write, the `Mutation` the
//! view must be fed. Records are kept in a BTreeMap so `record_ids` is
//! deterministic.

use std::collections::BTreeMap;

use serde_json::Value;

use super::mutation::Mutation;
use super::record::{RecordId, RecordSource};

#[derive(Debug, Clone, PartialEq)]
struct StoredRecord {
    object: Value,
    metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<RecordId, StoredRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write object and metadata. Returns `Insert` for a new record,
    /// otherwise an `Update` flagging what actually changed.
    pub fn set(&mut self, id: RecordId, object: Value, metadata: Option<Value>) -> Mutation {
        let record = StoredRecord { object, metadata };
        match self.records.insert(id.clone(), record) {
            None => Mutation::insert(id),
            Some(old) => {
                let new = &self.records[&id];
                let object_changed = old.object != new.object;
                let metadata_changed = old.metadata != new.metadata;
                Mutation::update(id, object_changed, metadata_changed)
            }
        }
    }

    /// Replace the object, keeping metadata. None if the record is missing.
    pub fn set_object(&mut self, id: &RecordId, object: Value) -> Option<Mutation> {
        let record = self.records.get_mut(id)?;
        let changed = record.object != object;
        record.object = object;
        Some(Mutation::update(id.clone(), changed, false))
    }

    /// Replace the metadata, keeping the object. None if the record is missing.
    pub fn set_metadata(&mut self, id: &RecordId, metadata: Option<Value>) -> Option<Mutation> {
        let record = self.records.get_mut(id)?;
        let changed = record.metadata != metadata;
        record.metadata = metadata;
        Some(Mutation::update(id.clone(), false, changed))
    }

    /// Mark a record as changed without changing it
    pub fn touch(&self, id: &RecordId) -> Option<Mutation> {
        self.records.contains_key(id).then(|| Mutation::touch(id.clone()))
    }

    /// Remove a record. Reported even if it did not exist.
    pub fn remove(&mut self, id: &RecordId) -> Mutation {
        self.records.remove(id);
        Mutation::remove(id.clone())
    }

    pub fn remove_collection(&mut self, collection: &str) -> Mutation {
        self.records.retain(|id, _| id.collection() != collection);
        Mutation::RemoveCollection {
            collection: collection.to_string(),
        }
    }

    pub fn clear(&mut self) -> Mutation {
        self.records.clear();
        Mutation::RemoveAll
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for MemoryStore {
    fn object(&self, id: &RecordId) -> Option<&Value> {
        self.records.get(id).map(|r| &r.object)
    }

    fn metadata(&self, id: &RecordId) -> Option<&Value> {
        self.records.get(id).and_then(|r| r.metadata.as_ref())
    }

    fn record_ids(&self) -> Vec<RecordId> {
        self.records.keys().cloned().collect()
    }
}
