//! View Property Tests
//!
//! Seeded random workloads checking that:
//! - Every group stays sorted after any mutation sequence
//! - Incremental maintenance matches a view rebuilt from scratch
//! - In-place re-positioning matches remove-then-insert
//! - The locator and group sequences agree

use std::cmp::Ordering;

use aeroview::observability::{Logger, Severity};
use aeroview::view::{
    MemoryStore, Mutation, RecordId, RecordSource, View, ViewDefinition, ViewGrouping, ViewSorting,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

const KEYS: usize = 40;

fn quiet() {
    Logger::set_min_severity(Severity::Error);
}

fn rid(n: usize) -> RecordId {
    RecordId::new("items", format!("{:03}", n))
}

fn value_of(obj: &Value) -> i64 {
    obj["v"].as_i64().unwrap_or_default()
}

/// Three buckets by value; negative values are excluded.
fn bucketed(name: &str) -> ViewDefinition {
    ViewDefinition::new(
        name,
        ViewGrouping::by_object(|_, obj| {
            let v = value_of(obj);
            (v >= 0).then(|| format!("g{}", v % 3))
        }),
        ViewSorting::by_object(|_, _, a, _, b| value_of(a).cmp(&value_of(b))),
    )
}

/// Total order: value, then key.
fn strictly_ordered(name: &str) -> ViewDefinition {
    ViewDefinition::new(
        name,
        ViewGrouping::by_object(|_, obj| {
            let v = value_of(obj);
            (v >= 0).then(|| format!("g{}", v % 3))
        }),
        ViewSorting::by_object(|_, id1, a, id2, b| {
            value_of(a).cmp(&value_of(b)).then_with(|| id1.cmp(id2))
        }),
    )
}

/// Random write against the store, returned as the mutation to feed.
fn random_write(rng: &mut StdRng, store: &mut MemoryStore) -> Mutation {
    let id = rid(rng.gen_range(0..KEYS));
    if rng.gen_bool(0.15) {
        return store.remove(&id);
    }
    // Small value range so ties are common
    let v: i64 = rng.gen_range(-2..12);
    store.set(id, json!({ "v": v }), None)
}

fn snapshot(view: &View) -> Vec<(String, Vec<RecordId>)> {
    let read = view.read().unwrap();
    read.groups()
        .into_iter()
        .map(|g| (g.to_string(), read.items_in_group(g).to_vec()))
        .collect()
}

fn assert_sorted(view: &View, store: &MemoryStore) {
    let read = view.read().unwrap();
    for group in read.groups() {
        let violations = read.ordering_violations(group, store).unwrap();
        assert!(violations.is_empty(), "group {} out of order at {:?}", group, violations);
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// Random single-mutation transactions keep every group sorted.
#[test]
fn test_random_mutations_keep_groups_sorted() {
    quiet();
    let mut rng = StdRng::seed_from_u64(7);
    let view = View::new(bucketed("random")).unwrap();
    let mut store = MemoryStore::new();

    for _ in 0..600 {
        let mutation = random_write(&mut rng, &mut store);
        let mut txn = view.write().unwrap();
        txn.apply(&store, &mutation).unwrap();
        txn.commit().unwrap();
    }

    assert_sorted(&view, &store);
}

/// Large batches keep every group sorted, including hint state across writes.
#[test]
fn test_random_batches_keep_groups_sorted() {
    quiet();
    let mut rng = StdRng::seed_from_u64(1234);
    let view = View::new(bucketed("batched")).unwrap();
    let mut store = MemoryStore::new();

    for _ in 0..20 {
        let mut txn = view.write().unwrap();
        for _ in 0..50 {
            let mutation = random_write(&mut rng, &mut store);
            txn.apply(&store, &mutation).unwrap();
        }
        txn.commit().unwrap();
        assert_sorted(&view, &store);
    }
}

// =============================================================================
// Equivalence
// =============================================================================

/// With a total order, the incrementally maintained view equals one built
/// from the final store contents.
#[test]
fn test_incremental_matches_rebuild() {
    quiet();
    let mut rng = StdRng::seed_from_u64(99);
    let view = View::new(strictly_ordered("incremental")).unwrap();
    let mut store = MemoryStore::new();

    for _ in 0..400 {
        let mutation = random_write(&mut rng, &mut store);
        let mut txn = view.write().unwrap();
        txn.apply(&store, &mutation).unwrap();
        txn.commit().unwrap();
    }

    let rebuilt = View::register(strictly_ordered("rebuilt"), &store).unwrap();
    assert_eq!(snapshot(&view), snapshot(&rebuilt));
}

/// Updating in place lands every record where remove-then-insert would.
fn assert_reposition_matches_reinsert(definition: fn(&str) -> ViewDefinition, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let in_place = View::new(definition("in_place")).unwrap();
    let reinsert = View::new(definition("reinsert")).unwrap();
    let mut store = MemoryStore::new();

    for _ in 0..500 {
        let mutation = random_write(&mut rng, &mut store);

        let mut txn = in_place.write().unwrap();
        txn.apply(&store, &mutation).unwrap();
        txn.commit().unwrap();

        let mut txn = reinsert.write().unwrap();
        match &mutation {
            // A touch never moves a record, so only real changes are replayed
            Mutation::Update {
                id,
                object_changed: true,
                ..
            } => {
                txn.apply(&store, &Mutation::remove(id.clone())).unwrap();
                txn.apply(&store, &Mutation::insert(id.clone())).unwrap();
            }
            other => txn.apply(&store, other).unwrap(),
        }
        txn.commit().unwrap();

        assert_eq!(snapshot(&in_place), snapshot(&reinsert), "after {:?}", mutation);
    }

    // The workload actually exercised the neighbour check
    assert!(in_place.metrics_snapshot().boundary_hits > 0);
}

#[test]
fn test_reposition_matches_remove_then_insert() {
    quiet();
    assert_reposition_matches_reinsert(strictly_ordered, 2024);
}

/// Ties included: the neighbour check places a record after the members it
/// ties with, like the binary search does.
#[test]
fn test_reposition_matches_remove_then_insert_with_ties() {
    quiet();
    assert_reposition_matches_reinsert(bucketed, 2025);
    assert_reposition_matches_reinsert(bucketed, 77);
}

// =============================================================================
// Structure
// =============================================================================

/// Each tracked record is in exactly one group, at the position reported.
#[test]
fn test_locator_agrees_with_sequences() {
    quiet();
    let mut rng = StdRng::seed_from_u64(5);
    let view = View::new(bucketed("locator")).unwrap();
    let mut store = MemoryStore::new();

    let mut txn = view.write().unwrap();
    for _ in 0..300 {
        let mutation = random_write(&mut rng, &mut store);
        txn.apply(&store, &mutation).unwrap();
    }
    txn.commit().unwrap();

    let read = view.read().unwrap();
    let mut seen = 0;
    for group in read.groups() {
        assert!(read.count_in_group(group) > 0, "empty group {} kept", group);
        for (index, id) in read.items_in_group(group).iter().enumerate() {
            assert_eq!(read.group_and_index_of(id), Some((group, index)));
            seen += 1;
        }
    }
    assert_eq!(seen, read.total_count());

    // Every stored record with a non-negative value is tracked
    for id in store.record_ids() {
        let v = value_of(store.object(&id).unwrap());
        assert_eq!(read.contains(&id), v >= 0, "record {}", id);
    }
}

/// Applying the same update a second time leaves the view unchanged, even
/// among ties.
#[test]
fn test_update_idempotent() {
    quiet();
    let mut rng = StdRng::seed_from_u64(31);
    let view = View::new(bucketed("idempotent")).unwrap();
    let mut store = MemoryStore::new();

    let mut txn = view.write().unwrap();
    for _ in 0..100 {
        let mutation = random_write(&mut rng, &mut store);
        txn.apply(&store, &mutation).unwrap();
    }
    txn.commit().unwrap();

    for id in store.record_ids() {
        let update = Mutation::update_object(id.clone());
        let mut txn = view.write().unwrap();
        txn.apply(&store, &update).unwrap();
        txn.commit().unwrap();
        let after_first = snapshot(&view);

        let mut txn = view.write().unwrap();
        txn.apply(&store, &update).unwrap();
        txn.commit().unwrap();
        assert_eq!(snapshot(&view), after_first, "second update of {} moved something", id);
    }
}

/// A comparator that always answers Equal keeps arrival order under updates.
#[test]
fn test_constant_sorting_is_stable() {
    quiet();
    let view = View::new(ViewDefinition::new(
        "constant",
        ViewGrouping::single("all"),
        ViewSorting::by_key(|_, _, _| Ordering::Equal),
    ))
    .unwrap();
    let mut store = MemoryStore::new();

    let mut txn = view.write().unwrap();
    for n in [4, 1, 3, 0, 2] {
        let mutation = store.set(rid(n), json!(n), None);
        txn.apply(&store, &mutation).unwrap();
    }
    let mutation = store.set(rid(3), json!(100), None);
    txn.apply(&store, &mutation).unwrap();
    txn.commit().unwrap();

    let read = view.read().unwrap();
    let order: Vec<&RecordId> = read.items_in_group("all").iter().collect();
    assert_eq!(order, vec![&rid(4), &rid(1), &rid(3), &rid(0), &rid(2)]);
}
