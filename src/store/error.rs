use thiserror::Error;

/// Errors surfaced by the helper layer and the driver bindings.
///
/// "Not found" is never an error: lookups return `Option` or an empty `Vec`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    /// The store could not be reached, or the handle was already closed.
    #[error("database unreachable: {0}")]
    Unreachable(String),

    #[error("database authentication failed: {0}")]
    Authentication(String),

    #[error("duplicate key in collection '{collection}': {message}")]
    DuplicateKey { collection: String, message: String },

    /// Malformed filter, update expression or projection, as reported by the store.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("database operation failed: {0}")]
    Operation(String),
}

impl DbError {
    pub fn invalid(message: impl Into<String>) -> Self {
        DbError::InvalidExpression(message.into())
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, DbError::Unreachable(_) | DbError::Authentication(_))
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DbError::DuplicateKey { .. })
    }
}
