//! Field-level resolver errors.

use crate::finder::FinderError;
use crate::loader::LoaderError;

/// Why a single field could not be resolved.
///
/// Errors stay local to the field that produced them; sibling fields
/// resolve independently.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolverError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("access denied")]
    AccessDenied,

    #[error("timezone not available for stop")]
    TimezoneUnavailable,

    /// A collaborator failed while resolving `field`.
    #[error("{field}: {source}")]
    Collaborator {
        field: &'static str,
        source: FinderError,
    },

    #[error("request cancelled")]
    Cancelled,
}

impl ResolverError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Attribute a collaborator failure to a field.
    pub fn collaborator(field: &'static str, source: FinderError) -> Self {
        match source {
            FinderError::Cancelled => Self::Cancelled,
            source => Self::Collaborator { field, source },
        }
    }
}

/// Attach a field name to collaborator and loader failures.
pub trait FieldResult<T> {
    fn field(self, name: &'static str) -> Result<T, ResolverError>;
}

impl<T> FieldResult<T> for Result<T, FinderError> {
    fn field(self, name: &'static str) -> Result<T, ResolverError> {
        self.map_err(|e| ResolverError::collaborator(name, e))
    }
}

impl<T> FieldResult<T> for Result<T, LoaderError> {
    fn field(self, name: &'static str) -> Result<T, ResolverError> {
        self.map_err(|e| match e {
            LoaderError::Cancelled => ResolverError::Cancelled,
            LoaderError::Fetch(e) => ResolverError::collaborator(name, e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborator_errors_name_the_field() {
        let r: Result<(), FinderError> = Err(FinderError::Backend("timeout".into()));
        let err = r.field("stop.stop_times").unwrap_err();
        assert_eq!(err.to_string(), "stop.stop_times: backend error: timeout");
    }

    #[test]
    fn cancellation_passes_through_unchanged() {
        let r: Result<(), LoaderError> = Err(LoaderError::Cancelled);
        assert_eq!(r.field("route.agency"), Err(ResolverError::Cancelled));
        let r: Result<(), FinderError> = Err(FinderError::Cancelled);
        assert_eq!(r.field("route.agency"), Err(ResolverError::Cancelled));
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(ResolverError::AccessDenied.to_string(), "access denied");
        assert_eq!(
            ResolverError::TimezoneUnavailable.to_string(),
            "timezone not available for stop"
        );
    }
}
