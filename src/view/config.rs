//! View definition and options
//!
//! A definition is fixed for the lifetime of a view. Changing the grouping,
//! sorting or find function means building a new view from scratch.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::block_type::BlockType;
use super::errors::{ViewError, ViewResult};
use super::find::ViewFind;
use super::grouping::ViewGrouping;
use super::sorting::ViewSorting;

/// Tunable, serializable view options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    /// When set, only records of these collections are considered.
    /// Other records are treated as excluded without calling the grouping.
    pub allowed_collections: Option<BTreeSet<String>>,

    /// Emit a TRACE log line for every applied mutation
    pub log_mutations: bool,
}

impl ViewOptions {
    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ViewResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ViewError::invalid_config(format!("options: {}", e)))
    }

    /// Restrict the view to the given collections
    pub fn with_allowed_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_collections = Some(collections.into_iter().map(Into::into).collect());
        self
    }

    /// Whether records of `collection` may enter the view
    pub fn allows(&self, collection: &str) -> bool {
        self.allowed_collections
            .as_ref()
            .map_or(true, |allowed| allowed.contains(collection))
    }

    fn validate(&self) -> ViewResult<()> {
        if let Some(allowed) = &self.allowed_collections {
            if allowed.is_empty() {
                return Err(ViewError::invalid_config(
                    "allowed_collections is empty and would exclude every record",
                ));
            }
        }
        Ok(())
    }
}

/// Everything needed to build a view
#[derive(Debug)]
pub struct ViewDefinition {
    pub name: String,
    pub grouping: ViewGrouping,
    pub sorting: ViewSorting,
    /// Only needed for range lookups through the configured finder
    pub find: Option<ViewFind>,
    pub options: ViewOptions,
}

impl ViewDefinition {
    pub fn new(name: impl Into<String>, grouping: ViewGrouping, sorting: ViewSorting) -> Self {
        Self {
            name: name.into(),
            grouping,
            sorting,
            find: None,
            options: ViewOptions::default(),
        }
    }

    pub fn with_find(mut self, find: ViewFind) -> Self {
        self.find = Some(find);
        self
    }

    pub fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    /// Reject unsupported combinations before any mutation is processed.
    pub fn validate(&self) -> ViewResult<()> {
        if self.name.trim().is_empty() {
            return Err(ViewError::invalid_config("view name must not be empty"));
        }
        if let Some(find) = &self.find {
            check_find_against_sorting(find.block_type(), self.sorting.block_type())?;
        }
        self.options.validate()
    }
}

/// A find function must not read a field the sorting never reads: it could not
/// agree with the sort order in general.
///
/// Stricter than necessary. A metadata finder over an object sorting is
/// rejected even when the metadata mirrors the sort key and the two would
/// agree. Such a view should sort by row and find by metadata instead.
pub(crate) fn check_find_against_sorting(find: BlockType, sorting: BlockType) -> ViewResult<()> {
    if sorting.covers(find) {
        Ok(())
    } else {
        Err(ViewError::invalid_config(format!(
            "{} find function cannot agree with a {} sorting",
            find, sorting
        )))
    }
}
