//! View error types
//!
//! Error codes:
//! - AERO_VIEW_INVALID_CONFIG (ERROR)
//! - AERO_VIEW_SOURCE_INCONSISTENT (FATAL)
//! - AERO_VIEW_TRANSACTION_ABORTED (ERROR)
//! - AERO_VIEW_LOCK_POISONED (FATAL)
//!
//! Missing groups and out-of-range positions are not errors. Queries return
//! empty results for them.

use std::fmt;

use thiserror::Error;

use super::record::RecordId;

/// Severity levels for view errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The operation was rejected, the view is intact
    Error,
    /// The write transaction must be discarded
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// View error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// Rejected at definition time, before any mutation is processed
    #[error("Invalid view configuration: {0}")]
    InvalidConfig(String),

    /// The storage collaborator could not produce a record the feed referenced
    #[error("Record source inconsistent for {id}: {reason}")]
    SourceInconsistent { id: RecordId, reason: String },

    /// A mutation failed earlier in this write transaction
    #[error("Write transaction on view '{0}' aborted by an earlier failure")]
    TransactionAborted(String),

    /// A thread panicked while holding a view lock
    #[error("View lock poisoned: {0}")]
    LockPoisoned(String),
}

impl ViewError {
    /// Create a configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Create a source inconsistency error
    pub fn source_inconsistent(id: &RecordId, reason: impl Into<String>) -> Self {
        Self::SourceInconsistent {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "AERO_VIEW_INVALID_CONFIG",
            Self::SourceInconsistent { .. } => "AERO_VIEW_SOURCE_INCONSISTENT",
            Self::TransactionAborted(_) => "AERO_VIEW_TRANSACTION_ABORTED",
            Self::LockPoisoned(_) => "AERO_VIEW_LOCK_POISONED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            Self::InvalidConfig(_) | Self::TransactionAborted(_) => Severity::Error,
            Self::SourceInconsistent { .. } | Self::LockPoisoned(_) => Severity::Fatal,
        }
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for view operations
pub type ViewResult<T> = Result<T, ViewError>;
