use thiserror::Error;

use crate::index::ContentRecord;
use crate::storage::{BlobHandle, ContentHash};

/// Why an engine operation failed. Backend error details are logged where they
/// happen and never carried past the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineFailure {
    #[error("Could not save file.")]
    SaveError,
    #[error("Could not save file metadata.")]
    MetadataError,
    #[error("Could not delete file.")]
    DeleteError,
    #[error("Could not read file.")]
    ReadError,
}

#[derive(Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// First successful upload of this content.
    Created { hash: ContentHash },
    /// The content was already stored; nothing was written.
    AlreadyExists { hash: ContentHash },
    Failure(EngineFailure),
}

impl UploadOutcome {
    pub fn hash(&self) -> Option<&ContentHash> {
        match self {
            Self::Created { hash } | Self::AlreadyExists { hash } => Some(hash),
            Self::Failure(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Found {
        record: ContentRecord,
        blob: BlobHandle,
    },
    NotFound,
    /// A record exists but its blob does not. Callers must present this
    /// exactly like [`DownloadOutcome::NotFound`].
    IntegrityAnomaly { record: ContentRecord },
    Failure(EngineFailure),
}

impl DownloadOutcome {
    /// True for every outcome a client sees as "no such file".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::IntegrityAnomaly { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// The requester does not own the content. Callers must present this
    /// exactly like [`DeleteOutcome::NotFound`].
    Unauthorized,
    Failure(EngineFailure),
}
