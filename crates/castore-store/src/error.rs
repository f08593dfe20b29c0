use std::time::Duration;

use castore_types::{Digest, StorePath, TypeError};

/// Errors from store backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path is not (or no longer) valid in the store.
    #[error("path not found: {0}")]
    NotFound(StorePath),

    /// No valid path carries this digest.
    #[error("no path with digest {0}")]
    DigestNotFound(Digest),

    /// A path was registered before one of its references.
    #[error("cannot register {path}: reference {reference} is not valid")]
    MissingReference {
        path: StorePath,
        reference: StorePath,
    },

    /// Another valid path already carries this digest under a different name.
    #[error("cannot register {path}: digest already belongs to {existing}")]
    DigestConflict {
        path: StorePath,
        existing: StorePath,
    },

    /// The path is held by a temporary root.
    #[error("{0} is rooted")]
    StillRooted(StorePath),

    /// Another valid path still refers to this one.
    #[error("{path} is still referenced by {referrer}")]
    StillReferenced {
        path: StorePath,
        referrer: StorePath,
    },

    /// A witness issued by a different backend instance was presented.
    #[error("witness for {0} was issued by another store")]
    ForeignWitness(StorePath),

    /// A suspending operation exceeded the configured limit.
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },

    /// The worker running a blocking backend call failed.
    #[error("store task failed: {0}")]
    TaskFailed(String),

    /// The store configuration is unusable.
    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
