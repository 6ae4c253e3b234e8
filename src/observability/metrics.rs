//! View maintenance counters
//!
//! - Counters only, monotonic
//! - Relaxed atomics: exact per counter, no cross-counter consistency

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub struct ViewMetrics {
    mutations_applied: AtomicU64,
    grouping_calls: AtomicU64,
    comparisons: AtomicU64,
    /// Updates left in place after checking both neighbours
    boundary_hits: AtomicU64,
    /// Placements resolved by the last-placement extremity check
    extremity_hits: AtomicU64,
    binary_searches: AtomicU64,
    /// Updates the sorting could not observe
    repositions_skipped: AtomicU64,
    rows_inserted: AtomicU64,
    rows_removed: AtomicU64,
    rows_moved: AtomicU64,
    groups_created: AtomicU64,
    groups_destroyed: AtomicU64,
    range_lookups: AtomicU64,
    commits: AtomicU64,
    aborts: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ViewMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_mutations(&self) {
        bump(&self.mutations_applied);
    }

    pub fn increment_grouping_calls(&self) {
        bump(&self.grouping_calls);
    }

    pub fn increment_comparisons(&self) {
        bump(&self.comparisons);
    }

    pub fn increment_boundary_hits(&self) {
        bump(&self.boundary_hits);
    }

    pub fn increment_extremity_hits(&self) {
        bump(&self.extremity_hits);
    }

    pub fn increment_binary_searches(&self) {
        bump(&self.binary_searches);
    }

    pub fn increment_repositions_skipped(&self) {
        bump(&self.repositions_skipped);
    }

    pub fn increment_rows_inserted(&self) {
        bump(&self.rows_inserted);
    }

    pub fn increment_rows_removed(&self) {
        bump(&self.rows_removed);
    }

    pub fn increment_rows_moved(&self) {
        bump(&self.rows_moved);
    }

    pub fn increment_groups_created(&self) {
        bump(&self.groups_created);
    }

    pub fn increment_groups_destroyed(&self) {
        bump(&self.groups_destroyed);
    }

    pub fn increment_range_lookups(&self) {
        bump(&self.range_lookups);
    }

    pub fn increment_commits(&self) {
        bump(&self.commits);
    }

    pub fn increment_aborts(&self) {
        bump(&self.aborts);
    }

    /// Comparator calls so far
    pub fn comparisons(&self) -> u64 {
        self.comparisons.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ViewMetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ViewMetricsSnapshot {
            mutations_applied: load(&self.mutations_applied),
            grouping_calls: load(&self.grouping_calls),
            comparisons: load(&self.comparisons),
            boundary_hits: load(&self.boundary_hits),
            extremity_hits: load(&self.extremity_hits),
            binary_searches: load(&self.binary_searches),
            repositions_skipped: load(&self.repositions_skipped),
            rows_inserted: load(&self.rows_inserted),
            rows_removed: load(&self.rows_removed),
            rows_moved: load(&self.rows_moved),
            groups_created: load(&self.groups_created),
            groups_destroyed: load(&self.groups_destroyed),
            range_lookups: load(&self.range_lookups),
            commits: load(&self.commits),
            aborts: load(&self.aborts),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain struct of integers, serialization cannot fail
        serde_json::to_string(&self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time copy of every counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewMetricsSnapshot {
    pub mutations_applied: u64,
    pub grouping_calls: u64,
    pub comparisons: u64,
    pub boundary_hits: u64,
    pub extremity_hits: u64,
    pub binary_searches: u64,
    pub repositions_skipped: u64,
    pub rows_inserted: u64,
    pub rows_removed: u64,
    pub rows_moved: u64,
    pub groups_created: u64,
    pub groups_destroyed: u64,
    pub range_lookups: u64,
    pub commits: u64,
    pub aborts: u64,
}
