//! aeroview - live grouped and sorted secondary views over a key-value store
//!
//! Views are derived, in-memory state maintained incrementally from the
//! storage layer's mutation feed.

pub mod observability;
pub mod view;
