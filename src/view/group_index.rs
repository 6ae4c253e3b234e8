//! Group arena and ordered record sequences
//!
//! Groups live in slots of an arena, addressed by `GroupId`. Freed slots are
//! recycled. Each slot holds an ordered `Vec<RecordId>` behind an `Arc`, so a
//! cloned index shares every sequence until a writer touches it.
//!
//! # Invariants
//!
//! - A record appears in at most one group
//! - No group is ever empty: the last removal destroys it
//! - `insert_at`, `remove_at` and `move_item` are the only mutations

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use super::errors::ViewResult;
use super::find::{RangePosition, ViewFind};
use super::record::{RecordId, RecordSource};
use super::sorting::ViewSorting;

/// Arena slot address
pub type GroupId = usize;

/// The ordered members of one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSequence {
    name: String,
    items: Vec<RecordId>,
}

impl GroupSequence {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RecordId> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&RecordId> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&RecordId> {
        self.items.last()
    }

    pub fn as_slice(&self) -> &[RecordId] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordId> {
        self.items.iter()
    }

    /// Linear scan for a member's position
    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.items.iter().position(|item| item == id)
    }
}

/// Every group of one view
///
/// The locator maps a record to its group only. Finding its position is a
/// linear scan of that group, so every update and delete of a tracked record
/// costs O(group size) before any comparison runs. The neighbour and extremity
/// checks save comparator calls, not that scan. Per-record positions would
/// need rewriting on every insert or remove in the middle of a group.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    slots: Vec<Option<Arc<GroupSequence>>>,
    free: Vec<GroupId>,
    by_name: BTreeMap<String, GroupId>,
    locator: HashMap<RecordId, GroupId>,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Structural primitives
    // ------------------------------------------------------------------

    /// Insert `id` at `index` of `group`, creating the group if needed.
    ///
    /// Returns the group's slot and whether the group was created.
    /// `index` must be at most the group's length.
    pub(crate) fn insert_at(&mut self, group: &str, index: usize, id: RecordId) -> (GroupId, bool) {
        let (gid, created) = match self.by_name.get(group) {
            Some(&gid) => (gid, false),
            None => (self.allocate(group), true),
        };
        self.locator.insert(id.clone(), gid);
        self.sequence_mut(gid).items.insert(index, id);
        (gid, created)
    }

    /// Remove the member at `index`. Returns it and whether the group died.
    pub(crate) fn remove_at(&mut self, gid: GroupId, index: usize) -> (RecordId, bool) {
        let sequence = self.sequence_mut(gid);
        let id = sequence.items.remove(index);
        let emptied = sequence.items.is_empty();
        self.locator.remove(&id);
        if emptied {
            self.release(gid);
        }
        (id, emptied)
    }

    /// Move the member at `from` so it ends up at `to`.
    pub(crate) fn move_item(&mut self, gid: GroupId, from: usize, to: usize) {
        if from == to {
            return;
        }
        let items = &mut self.sequence_mut(gid).items;
        let id = items.remove(from);
        items.insert(to, id);
    }

    fn allocate(&mut self, group: &str) -> GroupId {
        let sequence = Some(Arc::new(GroupSequence::new(group)));
        let gid = match self.free.pop() {
            Some(gid) => {
                self.slots[gid] = sequence;
                gid
            }
            None => {
                self.slots.push(sequence);
                self.slots.len() - 1
            }
        };
        self.by_name.insert(group.to_string(), gid);
        gid
    }

    fn release(&mut self, gid: GroupId) {
        if let Some(sequence) = self.slots[gid].take() {
            self.by_name.remove(sequence.name());
            self.free.push(gid);
        }
    }

    fn sequence_mut(&mut self, gid: GroupId) -> &mut GroupSequence {
        match &mut self.slots[gid] {
            Some(sequence) => Arc::make_mut(sequence),
            None => unreachable!("group slot {} is free", gid),
        }
    }

    // ------------------------------------------------------------------
    // Slot lookups
    // ------------------------------------------------------------------

    pub(crate) fn sequence(&self, gid: GroupId) -> Option<&GroupSequence> {
        self.slots.get(gid).and_then(|slot| slot.as_deref())
    }

    /// Sequence of a live slot
    pub(crate) fn slot(&self, gid: GroupId) -> &GroupSequence {
        match self.sequence(gid) {
            Some(sequence) => sequence,
            None => unreachable!("group slot {} is free", gid),
        }
    }

    pub(crate) fn group_id(&self, group: &str) -> Option<GroupId> {
        self.by_name.get(group).copied()
    }

    /// Slot and position of a tracked record. O(group size).
    pub(crate) fn locate(&self, id: &RecordId) -> Option<(GroupId, usize)> {
        let gid = *self.locator.get(id)?;
        let index = self.sequence(gid)?.position(id)?;
        Some((gid, index))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Group labels in ascending order
    pub fn groups(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    pub fn group_count(&self) -> usize {
        self.by_name.len()
    }

    pub fn group(&self, group: &str) -> Option<&GroupSequence> {
        self.by_name.get(group).and_then(|&gid| self.sequence(gid))
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.by_name.contains_key(group)
    }

    /// Number of members, 0 for a missing group
    pub fn count_in_group(&self, group: &str) -> usize {
        self.group(group).map_or(0, GroupSequence::len)
    }

    /// Number of records in the view
    pub fn total_count(&self) -> usize {
        self.locator.len()
    }

    /// Ordered members, empty for a missing group
    pub fn items_in_group(&self, group: &str) -> &[RecordId] {
        match self.group(group) {
            Some(sequence) => sequence.as_slice(),
            None => &[],
        }
    }

    pub fn item_at(&self, group: &str, index: usize) -> Option<&RecordId> {
        self.group(group)?.get(index)
    }

    pub fn first_in_group(&self, group: &str) -> Option<&RecordId> {
        self.group(group)?.first()
    }

    pub fn last_in_group(&self, group: &str) -> Option<&RecordId> {
        self.group(group)?.last()
    }

    /// Up to `len` members starting at `offset`, clamped to the group
    pub fn range_in_group(&self, group: &str, offset: usize, len: usize) -> &[RecordId] {
        let items = self.items_in_group(group);
        let start = offset.min(items.len());
        let end = offset.saturating_add(len).min(items.len());
        &items[start..end]
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.locator.contains_key(id)
    }

    pub fn group_of(&self, id: &RecordId) -> Option<&str> {
        let gid = *self.locator.get(id)?;
        self.sequence(gid).map(GroupSequence::name)
    }

    pub fn group_and_index_of(&self, id: &RecordId) -> Option<(&str, usize)> {
        let (gid, index) = self.locate(id)?;
        self.sequence(gid).map(|sequence| (sequence.name(), index))
    }

    /// Binary search for the contiguous run of members the finder places
    /// `Within`. Returns an empty range for a missing group or no match.
    ///
    /// The finder must agree with the view's sorting.
    pub fn find_range<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        find: &ViewFind,
        source: &S,
    ) -> ViewResult<Range<usize>> {
        let items = self.items_in_group(group);

        let start = partition_point(0, items.len(), |i| {
            Ok(find.locate(source, &items[i])? == RangePosition::Before)
        })?;
        let end = partition_point(start, items.len(), |i| {
            Ok(find.locate(source, &items[i])? != RangePosition::After)
        })?;

        Ok(start..end)
    }

    /// Members of the range located by `find`
    pub fn items_in_find_range<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        find: &ViewFind,
        source: &S,
    ) -> ViewResult<&[RecordId]> {
        let range = self.find_range(group, find, source)?;
        Ok(&self.items_in_group(group)[range])
    }

    /// Positions `i` where member `i` sorts after member `i + 1`.
    ///
    /// Always empty unless the sorting breaks its contract.
    pub fn ordering_violations<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        sorting: &ViewSorting,
        source: &S,
    ) -> ViewResult<Vec<usize>> {
        let items = self.items_in_group(group);
        let mut violations = Vec::new();
        for (i, pair) in items.windows(2).enumerate() {
            if sorting.compare(source, group, &pair[0], &pair[1])? == std::cmp::Ordering::Greater {
                violations.push(i);
            }
        }
        Ok(violations)
    }
}

/// First index in `lo..hi` where `pred` turns false. `pred` must be true for a
/// prefix of the range and false for the rest.
pub(crate) fn partition_point<F>(mut lo: usize, mut hi: usize, mut pred: F) -> ViewResult<usize>
where
    F: FnMut(usize) -> ViewResult<bool>,
{
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid)? {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}
