//! Live grouped and sorted views
//!
//! A view partitions records into named groups and keeps every group sorted
//! while records are inserted, updated and removed. It is derived state: it
//! holds record identifiers only and reads payloads from the storage engine
//! through `RecordSource`.
//!
//! # Invariants
//!
//! - Every group is ordered by the view's sorting between mutations
//! - A record is in at most one group; empty groups do not exist
//! - A write transaction's changes become visible together, or not at all
//!
//! # Example
//!
//! ```
//! use aeroview::view::{MemoryStore, RecordId, View, ViewDefinition, ViewGrouping, ViewSorting};
//! use serde_json::json;
//!
//! let definition = ViewDefinition::new(
//!     "by_score",
//!     ViewGrouping::single("all"),
//!     ViewSorting::by_object(|_, _, a, _, b| a.as_i64().cmp(&b.as_i64())),
//! );
//! let view = View::new(definition).unwrap();
//! let mut store = MemoryStore::new();
//!
//! let mut txn = view.write().unwrap();
//! for (key, score) in [("x", 3), ("y", 1)] {
//!     let mutation = store.set(RecordId::new("scores", key), json!(score), None);
//!     txn.apply(&store, &mutation).unwrap();
//! }
//! txn.commit().unwrap();
//!
//! let read = view.read().unwrap();
//! assert_eq!(read.first_in_group("all"), Some(&RecordId::new("scores", "y")));
//! ```

mod block_type;
mod changes;
mod config;
mod errors;
mod find;
mod group_index;
mod grouping;
mod maintainer;
mod memory;
mod mutation;
mod record;
mod sorting;
mod transaction;

pub use block_type::BlockType;
pub use changes::ViewChange;
pub use config::{ViewDefinition, ViewOptions};
pub use errors::{Severity, ViewError, ViewResult};
pub use find::{RangePosition, ViewFind};
pub use group_index::{GroupId, GroupIndex, GroupSequence};
pub use grouping::ViewGrouping;
pub use maintainer::{BatchState, Extremity, ViewMaintainer};
pub use memory::MemoryStore;
pub use mutation::Mutation;
pub use record::{RecordId, RecordSource, Row};
pub use sorting::ViewSorting;
pub use transaction::{View, ViewReadTransaction, ViewWriteTransaction};
