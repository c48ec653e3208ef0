//! Error types for namespace operations.

use gravel_kv::StoreError;
use thiserror::Error;

/// Result type alias for namespace operations.
pub type NamespaceResult<T> = Result<T, NamespaceError>;

/// Errors surfaced by the lifecycle manager and the garbage collector.
#[derive(Debug, Error)]
pub enum NamespaceError {
    #[error("namespace already exists")]
    AlreadyExists,

    /// Never created, already reclaimed, or (for key operations) tombstoned.
    #[error("namespace not found")]
    NotFound,

    #[error("namespace is being deleted")]
    Deleting,

    #[error("key not found")]
    KeyNotFound,

    #[error("invalid namespace name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("unrecognised lifecycle marker for namespace {name:?}")]
    Corrupt { name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
