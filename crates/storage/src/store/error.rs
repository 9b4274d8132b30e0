#![forbid(unsafe_code)]

use kp_core::{JobId, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid job: {0}")]
    Validation(#[from] ValidationError),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("job {id} has no valid stored form: {reason}")]
    Codec { id: String, reason: String },
    #[error("store is closed")]
    Closed,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when the backing database could not be reached at all, as
    /// opposed to a request the store understood and refused.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Sql(_) | Self::Closed)
    }
}
