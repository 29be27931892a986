use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The actor is authenticated but may not perform the mutation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A referenced Letter, Activity or User does not exist.
    #[error("{entity} not found: {}", join_ids(.ids))]
    Reference { entity: &'static str, ids: Vec<DbId> },

    #[error("Database error: {message}")]
    Database { message: String, transient: bool },

    #[error("File upload failed: {0}")]
    FileUpload(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build a [`CoreError::Reference`] for a single missing id.
    pub fn missing(entity: &'static str, id: DbId) -> Self {
        CoreError::Reference {
            entity,
            ids: vec![id],
        }
    }

    /// Whether retrying the failed operation could change its outcome.
    ///
    /// Only transient store failures qualify. Validation, authorization and
    /// reference errors are deterministic.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Database { transient: true, .. })
    }
}

fn join_ids(ids: &[DbId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
