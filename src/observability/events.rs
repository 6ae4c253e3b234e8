//! Observable view events

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    /// View definition accepted
    ViewRegistered,
    /// Initial population from the record source finished
    ViewPopulated,
    /// Definition rejected
    ViewConfigRejected,
    /// Write transaction opened
    WriteBegin,
    /// Write transaction published
    WriteCommit,
    /// Write transaction discarded
    WriteAbort,
    /// One mutation applied
    MutationApplied,
    /// The record source could not produce a record (FATAL)
    SourceInconsistent,
}

impl ViewEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewEvent::ViewRegistered => "VIEW_REGISTERED",
            ViewEvent::ViewPopulated => "VIEW_POPULATED",
            ViewEvent::ViewConfigRejected => "VIEW_CONFIG_REJECTED",
            ViewEvent::WriteBegin => "VIEW_WRITE_BEGIN",
            ViewEvent::WriteCommit => "VIEW_WRITE_COMMIT",
            ViewEvent::WriteAbort => "VIEW_WRITE_ABORT",
            ViewEvent::MutationApplied => "VIEW_MUTATION_APPLIED",
            ViewEvent::SourceInconsistent => "VIEW_SOURCE_INCONSISTENT",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ViewEvent::SourceInconsistent)
    }
}

impl fmt::Display for ViewEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
