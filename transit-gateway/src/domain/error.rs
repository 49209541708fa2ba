//! Domain error types.
//!
//! These errors represent malformed domain values supplied by callers.
//! They are distinct from collaborator (finder) failures.

use super::{CursorError, TimeError};

/// Domain-level errors for validation of caller-supplied values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Not an IANA timezone name
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("unknown relative date: {0}")]
    UnknownRelativeDate(String),
}
