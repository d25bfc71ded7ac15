use thiserror::Error;

use crate::storage::ContentHash;

/// Errors raised by a [`MetadataIndex`](super::MetadataIndex) backend.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A record for the hash already exists. Concurrent first uploads of the
    /// same content resolve through this error: one insert wins, the rest see
    /// `DuplicateKey`.
    #[error("content record already exists: {0}")]
    DuplicateKey(ContentHash),

    /// A stored row could not be decoded into a record.
    #[error("corrupt content record: {0}")]
    Corrupt(String),

    #[error("metadata backend error: {0}")]
    Backend(String),
}
