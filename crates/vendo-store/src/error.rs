//! Store error types.

use thiserror::Error;
use vendo_commerce::CommerceError;

/// Errors raised by the storage backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem trouble.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A lock was poisoned by a panicking writer.
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

impl From<StoreError> for CommerceError {
    fn from(e: StoreError) -> Self {
        CommerceError::Store(e.to_string())
    }
}
