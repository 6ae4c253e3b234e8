//! Views and their transactions
//!
//! # Concurrency
//!
//! - One writer per view: `ViewWriteTransaction` holds the writer mutex
//! - The writer mutates a private copy of the committed `GroupIndex`
//! - Readers hold an `Arc` of the committed index and never see a partial batch
//! - `commit` publishes the copy with a single pointer swap
//!
//! A failed mutation poisons the write transaction: it can only be rolled
//! back, and the committed index is left untouched.

use std::ops::{Deref, Range};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::observability::{
    log_event, Logger, Severity, ViewEvent, ViewMetrics, ViewMetricsSnapshot,
};

use super::changes::ViewChange;
use super::config::{check_find_against_sorting, ViewDefinition};
use super::errors::{ViewError, ViewResult};
use super::find::ViewFind;
use super::group_index::GroupIndex;
use super::maintainer::{BatchState, ViewMaintainer};
use super::mutation::Mutation;
use super::record::{RecordId, RecordSource};

/// A live grouped and sorted view
#[derive(Debug)]
pub struct View {
    definition: ViewDefinition,
    committed: RwLock<Arc<GroupIndex>>,
    writer: Mutex<()>,
    metrics: ViewMetrics,
}

impl View {
    /// Create an empty view. The definition is validated first.
    pub fn new(definition: ViewDefinition) -> ViewResult<Self> {
        if let Err(e) = definition.validate() {
            Logger::warn(
                ViewEvent::ViewConfigRejected.as_str(),
                &[("view", definition.name.as_str()), ("reason", e.to_string().as_str())],
            );
            return Err(e);
        }
        log_event(
            ViewEvent::ViewRegistered,
            &[
                ("view", definition.name.as_str()),
                ("grouping", definition.grouping.block_type().as_str()),
                ("sorting", definition.sorting.block_type().as_str()),
            ],
        );
        Ok(Self {
            definition,
            committed: RwLock::new(Arc::new(GroupIndex::new())),
            writer: Mutex::new(()),
            metrics: ViewMetrics::new(),
        })
    }

    /// Create a view and populate it from every record `source` holds.
    pub fn register<S: RecordSource + ?Sized>(
        definition: ViewDefinition,
        source: &S,
    ) -> ViewResult<Self> {
        let view = Self::new(definition)?;
        {
            let mut txn = view.write()?;
            for id in source.record_ids() {
                txn.apply(source, &Mutation::insert(id))?;
            }
            txn.commit()?;
        }
        {
            let index = view.read()?;
            log_event(
                ViewEvent::ViewPopulated,
                &[
                    ("view", view.name()),
                    ("records", index.total_count().to_string().as_str()),
                    ("groups", index.group_count().to_string().as_str()),
                ],
            );
        }
        Ok(view)
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ViewDefinition {
        &self.definition
    }

    pub fn metrics(&self) -> &ViewMetrics {
        &self.metrics
    }

    pub fn metrics_snapshot(&self) -> ViewMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Snapshot of the last committed state
    pub fn read(&self) -> ViewResult<ViewReadTransaction<'_>> {
        let committed = self
            .committed
            .read()
            .map_err(|_| ViewError::LockPoisoned(format!("view '{}' committed index", self.name())))?;
        Ok(ViewReadTransaction {
            view: self,
            index: Arc::clone(&committed),
        })
    }

    /// Open the single write transaction, blocking while another is open.
    pub fn write(&self) -> ViewResult<ViewWriteTransaction<'_>> {
        let guard = self
            .writer
            .lock()
            .map_err(|_| ViewError::LockPoisoned(format!("view '{}' writer", self.name())))?;
        let working = {
            let committed = self.committed.read().map_err(|_| {
                ViewError::LockPoisoned(format!("view '{}' committed index", self.name()))
            })?;
            GroupIndex::clone(&committed)
        };
        Logger::trace(ViewEvent::WriteBegin.as_str(), &[("view", self.name())]);
        Ok(ViewWriteTransaction {
            view: self,
            _guard: guard,
            working,
            state: BatchState::new(),
            changes: Vec::new(),
            failed: false,
            finished: false,
        })
    }

    fn publish(&self, index: GroupIndex) -> ViewResult<()> {
        let mut committed = self
            .committed
            .write()
            .map_err(|_| ViewError::LockPoisoned(format!("view '{}' committed index", self.name())))?;
        *committed = Arc::new(index);
        Ok(())
    }

    /// Range lookup with the view's configured finder
    fn configured_find(&self) -> ViewResult<&ViewFind> {
        self.definition.find.as_ref().ok_or_else(|| {
            ViewError::invalid_config(format!("view '{}' has no find function", self.name()))
        })
    }

    fn find_range_in<S: RecordSource + ?Sized>(
        &self,
        index: &GroupIndex,
        group: &str,
        find: &ViewFind,
        source: &S,
    ) -> ViewResult<Range<usize>> {
        check_find_against_sorting(find.block_type(), self.definition.sorting.block_type())?;
        self.metrics.increment_range_lookups();
        index.find_range(group, find, source)
    }
}

/// Read-only snapshot of a view. Dereferences to the committed `GroupIndex`.
pub struct ViewReadTransaction<'v> {
    view: &'v View,
    index: Arc<GroupIndex>,
}

impl<'v> ViewReadTransaction<'v> {
    pub fn index(&self) -> &GroupIndex {
        &self.index
    }

    /// Range located by the view's configured finder
    pub fn find_range<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        source: &S,
    ) -> ViewResult<Range<usize>> {
        let find = self.view.configured_find()?;
        self.view.find_range_in(&self.index, group, find, source)
    }

    /// Range located by an ad-hoc finder. It must agree with the sorting.
    pub fn find_range_with<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        find: &ViewFind,
        source: &S,
    ) -> ViewResult<Range<usize>> {
        self.view.find_range_in(&self.index, group, find, source)
    }

    /// Members in the range located by the configured finder
    pub fn find_items<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        source: &S,
    ) -> ViewResult<Vec<RecordId>> {
        let range = self.find_range(group, source)?;
        Ok(self.index.items_in_group(group)[range].to_vec())
    }

    /// Adjacent positions that break the sort order (empty unless the sorting
    /// violates its contract)
    pub fn ordering_violations<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        source: &S,
    ) -> ViewResult<Vec<usize>> {
        self.index
            .ordering_violations(group, &self.view.definition.sorting, source)
    }
}

impl Deref for ViewReadTransaction<'_> {
    type Target = GroupIndex;

    fn deref(&self) -> &GroupIndex {
        &self.index
    }
}

/// The single writer of a view. Dereferences to its working `GroupIndex`,
/// so reads inside the transaction see its own changes.
///
/// Dropping it without `commit` or `rollback` discards the batch and counts
/// as an abort.
pub struct ViewWriteTransaction<'v> {
    view: &'v View,
    _guard: MutexGuard<'v, ()>,
    working: GroupIndex,
    state: BatchState,
    changes: Vec<ViewChange>,
    failed: bool,
    finished: bool,
}

impl<'v> ViewWriteTransaction<'v> {
    /// Apply one mutation reported by the storage layer.
    pub fn apply<S: RecordSource + ?Sized>(
        &mut self,
        source: &S,
        mutation: &Mutation,
    ) -> ViewResult<()> {
        if self.failed {
            return Err(ViewError::TransactionAborted(self.view.name().to_string()));
        }
        let maintainer = ViewMaintainer::new(&self.view.definition, &self.view.metrics);
        let result = maintainer.apply(
            &mut self.working,
            &mut self.state,
            source,
            mutation,
            &mut self.changes,
        );
        if let Err(e) = &result {
            self.failed = true;
            log_event(
                ViewEvent::SourceInconsistent,
                &[("view", self.view.name()), ("error", e.to_string().as_str())],
            );
        }
        result
    }

    /// Apply a batch in order, stopping at the first failure.
    pub fn apply_all<'m, S, I>(&mut self, source: &S, mutations: I) -> ViewResult<()>
    where
        S: RecordSource + ?Sized,
        I: IntoIterator<Item = &'m Mutation>,
    {
        for mutation in mutations {
            self.apply(source, mutation)?;
        }
        Ok(())
    }

    /// Changes recorded so far
    pub fn changes(&self) -> &[ViewChange] {
        &self.changes
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Range located by the view's configured finder, over uncommitted state
    pub fn find_range<S: RecordSource + ?Sized>(
        &self,
        group: &str,
        source: &S,
    ) -> ViewResult<Range<usize>> {
        let find = self.view.configured_find()?;
        self.view.find_range_in(&self.working, group, find, source)
    }

    /// Publish every change at once and return the change log.
    pub fn commit(mut self) -> ViewResult<Vec<ViewChange>> {
        if self.failed {
            self.abort(Severity::Warn, "failed");
            return Err(ViewError::TransactionAborted(self.view.name().to_string()));
        }
        let working = std::mem::take(&mut self.working);
        // If publishing fails, Drop records the abort
        self.view.publish(working)?;
        self.finished = true;

        let view = self.view;
        view.metrics.increment_commits();
        let changes = std::mem::take(&mut self.changes);
        Logger::trace(
            ViewEvent::WriteCommit.as_str(),
            &[("view", view.name()), ("changes", changes.len().to_string().as_str())],
        );
        Ok(changes)
    }

    /// Discard every change
    pub fn rollback(mut self) {
        self.abort(Severity::Trace, "rollback");
    }

    fn abort(&mut self, severity: Severity, reason: &str) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.view.metrics.increment_aborts();
        Logger::log(
            severity,
            ViewEvent::WriteAbort.as_str(),
            &[("view", self.view.name()), ("reason", reason)],
        );
    }
}

impl Drop for ViewWriteTransaction<'_> {
    fn drop(&mut self) {
        self.abort(Severity::Warn, "dropped");
    }
}

impl Deref for ViewWriteTransaction<'_> {
    type Target = GroupIndex;

    fn deref(&self) -> &GroupIndex {
        &self.working
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{MemoryStore, RangePosition, ViewGrouping, ViewSorting};
    use serde_json::json;

    fn definition() -> ViewDefinition {
        ViewDefinition::new(
            "numbers",
            ViewGrouping::single("all"),
            ViewSorting::by_object(|_, _, a, _, b| a.as_i64().cmp(&b.as_i64())),
        )
        .with_find(ViewFind::by_object(|_, obj| match obj.as_i64() {
            Some(v) if v < 3 => RangePosition::Before,
            Some(v) if v > 5 => RangePosition::After,
            _ => RangePosition::Within,
        }))
    }

    #[test]
    fn test_writer_sees_own_changes_readers_do_not() {
        let view = View::new(definition()).unwrap();
        let mut store = MemoryStore::new();

        let mut txn = view.write().unwrap();
        let m = store.set(RecordId::new("n", "a"), json!(1), None);
        txn.apply(&store, &m).unwrap();
        assert_eq!(txn.count_in_group("all"), 1);
        assert_eq!(view.read().unwrap().total_count(), 0);

        txn.commit().unwrap();
        assert_eq!(view.read().unwrap().total_count(), 1);
    }

    #[test]
    fn test_reader_snapshot_is_stable() {
        let view = View::new(definition()).unwrap();
        let mut store = MemoryStore::new();

        let before = view.read().unwrap();
        let mut txn = view.write().unwrap();
        let m = store.set(RecordId::new("n", "a"), json!(1), None);
        txn.apply(&store, &m).unwrap();
        txn.commit().unwrap();

        assert_eq!(before.total_count(), 0);
        assert_eq!(view.read().unwrap().total_count(), 1);
    }

    #[test]
    fn test_rollback_discards() {
        let view = View::new(definition()).unwrap();
        let mut store = MemoryStore::new();

        let mut txn = view.write().unwrap();
        let m = store.set(RecordId::new("n", "a"), json!(1), None);
        txn.apply(&store, &m).unwrap();
        txn.rollback();

        assert_eq!(view.read().unwrap().total_count(), 0);
        assert_eq!(view.metrics_snapshot().aborts, 1);
    }

    #[test]
    fn test_drop_without_commit_counts_abort() {
        let view = View::new(definition()).unwrap();
        let mut store = MemoryStore::new();

        {
            let mut txn = view.write().unwrap();
            let m = store.set(RecordId::new("n", "a"), json!(1), None);
            txn.apply(&store, &m).unwrap();
        }

        assert_eq!(view.read().unwrap().total_count(), 0);
        let snap = view.metrics_snapshot();
        assert_eq!(snap.aborts, 1);
        assert_eq!(snap.commits, 0);

        // The writer lock was released by the drop
        let txn = view.write().unwrap();
        txn.commit().unwrap();
        let snap = view.metrics_snapshot();
        assert_eq!(snap.aborts, 1);
        assert_eq!(snap.commits, 1);
    }

    #[test]
    fn test_failed_commit_counts_one_abort() {
        let view = View::new(definition()).unwrap();
        let store = MemoryStore::new();

        let mut txn = view.write().unwrap();
        assert!(txn.apply(&store, &Mutation::insert(RecordId::new("n", "ghost"))).is_err());
        assert!(txn.commit().is_err());
        assert_eq!(view.metrics_snapshot().aborts, 1);
    }

    #[test]
    fn test_failure_poisons_transaction() {
        let view = View::new(definition()).unwrap();
        let mut store = MemoryStore::new();

        let mut txn = view.write().unwrap();
        let m = store.set(RecordId::new("n", "a"), json!(1), None);
        txn.apply(&store, &m).unwrap();

        let ghost = Mutation::insert(RecordId::new("n", "ghost"));
        assert!(txn.apply(&store, &ghost).is_err());
        assert!(txn.is_failed());
        assert_eq!(
            txn.apply(&store, &m).unwrap_err().code(),
            "AERO_VIEW_TRANSACTION_ABORTED"
        );
        assert!(txn.commit().is_err());

        // Nothing from the batch is visible
        assert_eq!(view.read().unwrap().total_count(), 0);
    }

    #[test]
    fn test_register_populates() {
        let mut store = MemoryStore::new();
        for (key, value) in [("a", 3), ("b", 1), ("c", 2)] {
            store.set(RecordId::new("n", key), json!(value), None);
        }
        let view = View::register(definition(), &store).unwrap();
        let read = view.read().unwrap();
        let keys: Vec<&str> = read.items_in_group("all").iter().map(RecordId::key).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_configured_find_range() {
        let mut store = MemoryStore::new();
        for i in 0..8 {
            store.set(RecordId::new("n", i.to_string()), json!(i), None);
        }
        let view = View::register(definition(), &store).unwrap();
        let read = view.read().unwrap();
        assert_eq!(read.find_range("all", &store).unwrap(), 3..6);
        assert_eq!(read.find_range("missing", &store).unwrap(), 0..0);
        assert_eq!(view.metrics_snapshot().range_lookups, 2);
    }

    #[test]
    fn test_find_without_finder_is_config_error() {
        let definition = ViewDefinition::new(
            "plain",
            ViewGrouping::single("all"),
            ViewSorting::by_key(|_, a, b| a.cmp(b)),
        );
        let view = View::new(definition).unwrap();
        let store = MemoryStore::new();
        let err = view.read().unwrap().find_range("all", &store).unwrap_err();
        assert_eq!(err.code(), "AERO_VIEW_INVALID_CONFIG");
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let definition = ViewDefinition::new(
            "",
            ViewGrouping::single("all"),
            ViewSorting::by_key(|_, a, b| a.cmp(b)),
        );
        assert!(View::new(definition).is_err());
    }
}
