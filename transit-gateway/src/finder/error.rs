//! Collaborator error types.

/// Errors returned by finders and other collaborators.
///
/// Cloneable because one batch failure is handed to every caller that
/// shared the batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FinderError {
    /// The entity does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The query cannot be answered as asked
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Storage or decoding failure
    #[error("backend error: {0}")]
    Backend(String),

    /// The collaborator does not implement this capability
    #[error("not supported: {0}")]
    Unsupported(&'static str),

    #[error("request cancelled")]
    Cancelled,
}

impl FinderError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
