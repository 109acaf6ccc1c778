//! Error types for the cache manager.

use strata_store::StoreError;
use thiserror::Error;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors surfaced to callers of the cache manager.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManagerError {
    /// A store tier failed and no configured fallback absorbed it.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The access validator denied the operation, or the access level
    /// changed while the operation was in flight.
    #[error("user access invalid")]
    UserAccessInvalid,

    /// The request was dropped before it produced a terminal result.
    #[error("request cancelled")]
    Cancelled,
}

impl ManagerError {
    /// The underlying store failure, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}
