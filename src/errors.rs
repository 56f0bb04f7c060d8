use serde::Serialize;

use crate::store::StoreError;

/// Error taxonomy for the fulfillment core.
///
/// `ValidationError`, `Conflict` and `EmptyPackage` are recoverable operator
/// errors and never touch the persisted tables. `PersistenceFailure` means a
/// table save failed; the in-progress session is left intact so the caller
/// can retry the operation.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Package has no items")]
    EmptyPackage,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(
        #[from]
        #[serde(skip)]
        StoreError,
    ),
}

impl ServiceError {
    /// Convenience constructor for validation failures.
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}
