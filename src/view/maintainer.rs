//! View maintainer
//!
//! Applies one storage mutation at a time to a `GroupIndex`.
//!
//! # Placement
//!
//! A record new to a group is placed by:
//! 1. Extremity check: if the previous placement in this group landed at the
//!    start (or end), test that extreme first. Cheap for monotonic feeds.
//! 2. Binary search (upper bound).
//!
//! A record that stays in its group after an update is first skipped entirely
//! when the sorting cannot observe the change, then kept in place if it still
//! sorts between its two neighbours, and only then placed as above over the
//! group without itself.
//!
//! # Ties
//!
//! A placed record goes after every member it compares `Equal` to. The
//! neighbour, extremity and binary-search paths all follow this rule, so an
//! update lands exactly where removing and re-inserting the record would put
//! it. Once placed after its ties, a repeated update leaves it in place.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::observability::{Logger, ViewEvent, ViewMetrics};

use super::changes::ViewChange;
use super::config::ViewDefinition;
use super::errors::{ViewError, ViewResult};
use super::group_index::{partition_point, GroupId, GroupIndex};
use super::mutation::Mutation;
use super::record::{RecordId, RecordSource};

/// End of a group the last placement landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremity {
    Start,
    End,
}

/// Per-group transient state carried across the mutations of one batch.
#[derive(Debug, Clone, Default)]
pub struct BatchState {
    last_placement: HashMap<String, Extremity>,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_placement(&self, group: &str) -> Option<Extremity> {
        self.last_placement.get(group).copied()
    }

    fn record_placement(&mut self, group: &str, index: usize, len: usize) {
        let extremity = if index + 1 == len {
            Some(Extremity::End)
        } else if index == 0 {
            Some(Extremity::Start)
        } else {
            None
        };
        match extremity {
            Some(extremity) => {
                self.last_placement.insert(group.to_string(), extremity);
            }
            None => {
                self.last_placement.remove(group);
            }
        }
    }

    fn forget(&mut self, group: &str) {
        self.last_placement.remove(group);
    }
}

/// Members of a group, optionally with one position hidden.
#[derive(Clone, Copy)]
struct Candidates<'a> {
    items: &'a [RecordId],
    skip: Option<usize>,
}

impl<'a> Candidates<'a> {
    fn all(items: &'a [RecordId]) -> Self {
        Self { items, skip: None }
    }

    fn skipping(items: &'a [RecordId], position: usize) -> Self {
        Self {
            items,
            skip: Some(position),
        }
    }

    fn len(&self) -> usize {
        self.items.len() - usize::from(self.skip.is_some())
    }

    fn get(&self, i: usize) -> &'a RecordId {
        match self.skip {
            Some(skip) if i >= skip => &self.items[i + 1],
            _ => &self.items[i],
        }
    }
}

/// Where a tracked record currently sits
struct Placement {
    gid: GroupId,
    position: usize,
    group: String,
}

pub struct ViewMaintainer<'v> {
    definition: &'v ViewDefinition,
    metrics: &'v ViewMetrics,
}

impl<'v> ViewMaintainer<'v> {
    pub fn new(definition: &'v ViewDefinition, metrics: &'v ViewMetrics) -> Self {
        Self {
            definition,
            metrics,
        }
    }

    /// Apply one mutation, appending the structural changes to `changes`.
    ///
    /// On error `index` may be partially updated and must be discarded.
    pub fn apply<S: RecordSource + ?Sized>(
        &self,
        index: &mut GroupIndex,
        state: &mut BatchState,
        source: &S,
        mutation: &Mutation,
        changes: &mut Vec<ViewChange>,
    ) -> ViewResult<()> {
        match mutation {
            Mutation::Insert { id } => self.upsert(index, state, source, id, true, true, changes)?,
            Mutation::Update {
                id,
                object_changed,
                metadata_changed,
            } => self.upsert(
                index,
                state,
                source,
                id,
                *object_changed,
                *metadata_changed,
                changes,
            )?,
            Mutation::Remove { id } => self.remove(index, state, id, changes),
            Mutation::RemoveCollection { collection } => {
                self.remove_where(index, state, |id| id.collection() == collection, changes)
            }
            Mutation::RemoveAll => self.remove_where(index, state, |_| true, changes),
        }

        self.metrics.increment_mutations();
        if self.definition.options.log_mutations {
            let target = match mutation {
                Mutation::Insert { id } | Mutation::Update { id, .. } | Mutation::Remove { id } => {
                    id.to_string()
                }
                Mutation::RemoveCollection { collection } => collection.clone(),
                Mutation::RemoveAll => String::new(),
            };
            Logger::trace(
                ViewEvent::MutationApplied.as_str(),
                &[
                    ("view", self.definition.name.as_str()),
                    ("op", mutation.kind()),
                    ("target", target.as_str()),
                ],
            );
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert<S: RecordSource + ?Sized>(
        &self,
        index: &mut GroupIndex,
        state: &mut BatchState,
        source: &S,
        id: &RecordId,
        object_changed: bool,
        metadata_changed: bool,
        changes: &mut Vec<ViewChange>,
    ) -> ViewResult<()> {
        if !self.definition.options.allows(id.collection()) {
            return Ok(());
        }
        if !source.contains(id) {
            return Err(ViewError::source_inconsistent(
                id,
                "mutation reported for a record the source does not hold",
            ));
        }

        let current = index.locate(id).map(|(gid, position)| Placement {
            gid,
            position,
            group: index.slot(gid).name().to_string(),
        });

        let grouping = &self.definition.grouping;
        let new_group = match &current {
            Some(placement)
                if !grouping
                    .block_type()
                    .affected_by(object_changed, metadata_changed) =>
            {
                Some(placement.group.clone())
            }
            _ => {
                self.metrics.increment_grouping_calls();
                grouping.group(source, id)?
            }
        };

        let Some(new_group) = new_group else {
            if current.is_some() {
                self.remove(index, state, id, changes);
            }
            return Ok(());
        };

        match current {
            Some(placement) if placement.group == new_group => self.reposition(
                index,
                state,
                source,
                placement,
                id,
                object_changed,
                metadata_changed,
                changes,
            ),
            Some(_) => {
                self.remove(index, state, id, changes);
                self.place_new(index, state, source, &new_group, id, changes)
            }
            None => self.place_new(index, state, source, &new_group, id, changes),
        }
    }

    fn place_new<S: RecordSource + ?Sized>(
        &self,
        index: &mut GroupIndex,
        state: &mut BatchState,
        source: &S,
        group: &str,
        id: &RecordId,
        changes: &mut Vec<ViewChange>,
    ) -> ViewResult<()> {
        let position = match index.group(group) {
            Some(sequence) => self.insertion_point(
                source,
                group,
                Candidates::all(sequence.as_slice()),
                id,
                state.last_placement(group),
            )?,
            None => 0,
        };

        let (gid, created) = index.insert_at(group, position, id.clone());
        if created {
            self.metrics.increment_groups_created();
            changes.push(ViewChange::GroupInserted {
                group: group.to_string(),
            });
        }
        self.metrics.increment_rows_inserted();
        changes.push(ViewChange::RowInserted {
            id: id.clone(),
            group: group.to_string(),
            index: position,
        });
        state.record_placement(group, position, index.slot(gid).len());
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn reposition<S: RecordSource + ?Sized>(
        &self,
        index: &mut GroupIndex,
        state: &mut BatchState,
        source: &S,
        placement: Placement,
        id: &RecordId,
        object_changed: bool,
        metadata_changed: bool,
        changes: &mut Vec<ViewChange>,
    ) -> ViewResult<()> {
        let Placement {
            gid,
            position,
            group,
        } = placement;

        let updated_in_place = |changes: &mut Vec<ViewChange>| {
            changes.push(ViewChange::RowUpdated {
                id: id.clone(),
                group: group.clone(),
                index: position,
                object_changed,
                metadata_changed,
            });
        };

        if !self
            .definition
            .sorting
            .block_type()
            .affected_by(object_changed, metadata_changed)
        {
            self.metrics.increment_repositions_skipped();
            updated_in_place(changes);
            return Ok(());
        }

        let items = index.slot(gid).as_slice();
        let len = items.len();

        if self.between_neighbours(source, &group, items, position, id)? {
            self.metrics.increment_boundary_hits();
            updated_in_place(changes);
            return Ok(());
        }

        let target = self.insertion_point(
            source,
            &group,
            Candidates::skipping(items, position),
            id,
            state.last_placement(&group),
        )?;

        if target == position {
            updated_in_place(changes);
        } else {
            index.move_item(gid, position, target);
            self.metrics.increment_rows_moved();
            changes.push(ViewChange::RowMoved {
                id: id.clone(),
                group: group.clone(),
                from: position,
                to: target,
            });
        }
        state.record_placement(&group, target, len);
        Ok(())
    }

    /// Whether `left <= id < right` still holds at `position`.
    fn between_neighbours<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        group: &str,
        items: &[RecordId],
        position: usize,
        id: &RecordId,
    ) -> ViewResult<bool> {
        if position > 0 && self.compare(source, group, &items[position - 1], id)? == Ordering::Greater
        {
            return Ok(false);
        }
        if position + 1 < items.len()
            && self.compare(source, group, id, &items[position + 1])? != Ordering::Less
        {
            return Ok(false);
        }
        Ok(true)
    }

    /// Index at which `id` belongs among `candidates` (which exclude `id`).
    fn insertion_point<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        group: &str,
        candidates: Candidates<'_>,
        id: &RecordId,
        hint: Option<Extremity>,
    ) -> ViewResult<usize> {
        let len = candidates.len();
        if len == 0 {
            return Ok(0);
        }

        match hint {
            Some(Extremity::End) => {
                if self.compare(source, group, id, candidates.get(len - 1))? != Ordering::Less {
                    self.metrics.increment_extremity_hits();
                    return Ok(len);
                }
            }
            Some(Extremity::Start) => {
                if self.compare(source, group, id, candidates.get(0))? == Ordering::Less {
                    self.metrics.increment_extremity_hits();
                    return Ok(0);
                }
            }
            None => {}
        }

        self.metrics.increment_binary_searches();
        partition_point(0, len, |i| {
            Ok(self.compare(source, group, candidates.get(i), id)? != Ordering::Greater)
        })
    }

    fn compare<S: RecordSource + ?Sized>(
        &self,
        source: &S,
        group: &str,
        a: &RecordId,
        b: &RecordId,
    ) -> ViewResult<Ordering> {
        self.metrics.increment_comparisons();
        self.definition.sorting.compare(source, group, a, b)
    }

    fn remove(
        &self,
        index: &mut GroupIndex,
        state: &mut BatchState,
        id: &RecordId,
        changes: &mut Vec<ViewChange>,
    ) {
        let Some((gid, position)) = index.locate(id) else {
            return;
        };
        let group = index.slot(gid).name().to_string();
        let (removed, emptied) = index.remove_at(gid, position);
        self.record_removal(state, removed, group, position, emptied, changes);
    }

    fn remove_where<P>(
        &self,
        index: &mut GroupIndex,
        state: &mut BatchState,
        doomed: P,
        changes: &mut Vec<ViewChange>,
    ) where
        P: Fn(&RecordId) -> bool,
    {
        let groups: Vec<String> = index.groups().into_iter().map(String::from).collect();
        for group in groups {
            let Some(gid) = index.group_id(&group) else {
                continue;
            };
            let positions: Vec<usize> = index
                .slot(gid)
                .iter()
                .enumerate()
                .filter(|(_, id)| doomed(*id))
                .map(|(i, _)| i)
                .collect();
            // Back to front so earlier positions stay valid
            for &position in positions.iter().rev() {
                let (removed, emptied) = index.remove_at(gid, position);
                self.record_removal(state, removed, group.clone(), position, emptied, changes);
            }
        }
    }

    fn record_removal(
        &self,
        state: &mut BatchState,
        id: RecordId,
        group: String,
        position: usize,
        emptied: bool,
        changes: &mut Vec<ViewChange>,
    ) {
        self.metrics.increment_rows_removed();
        changes.push(ViewChange::RowDeleted {
            id,
            group: group.clone(),
            index: position,
        });
        if emptied {
            self.metrics.increment_groups_destroyed();
            state.forget(&group);
            changes.push(ViewChange::GroupDeleted { group });
        }
    }
}
