//! The storage engine: one consistent view over a [`BlobStore`] and a
//! [`MetadataIndex`] that fail independently and share no transaction.
//!
//! Consistency rules:
//!
//! - Upload writes the blob before the record, so a live record always has
//!   its blob. A failed record insert rolls the blob back through an upload
//!   saga.
//! - Concurrent first uploads of the same content are resolved by the index's
//!   uniqueness constraint alone; the engine takes no locks.
//! - Delete removes the blob before the record. An interruption between the
//!   two leaves a record without blob, which reads report as not found and the
//!   reconciliation sweep removes.

mod outcome;
mod saga;

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::index::{ContentRecord, IndexError, MetadataIndex, Principal};
use crate::retry::RetryPolicy;
use crate::storage::{BlobStore, ContentHash};

pub use outcome::{DeleteOutcome, DownloadOutcome, EngineFailure, UploadOutcome};
use saga::UploadSaga;

#[derive(Clone)]
pub struct StorageEngine {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn MetadataIndex>,
    compensation: RetryPolicy,
}

impl StorageEngine {
    pub fn new(blobs: Arc<dyn BlobStore>, index: Arc<dyn MetadataIndex>) -> Self {
        Self {
            blobs,
            index,
            compensation: RetryPolicy::NONE,
        }
    }

    /// Retry policy for the compensating blob delete after a failed insert.
    pub fn with_compensation_policy(mut self, policy: RetryPolicy) -> Self {
        self.compensation = policy;
        self
    }

    pub fn blob_store(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    pub fn index(&self) -> &Arc<dyn MetadataIndex> {
        &self.index
    }

    /// Store `content`, deduplicating by its hash.
    ///
    /// Only the first successful upload of a given content creates a record;
    /// every later upload, by anyone and under any filename, returns
    /// [`UploadOutcome::AlreadyExists`] and changes nothing.
    #[instrument(skip(self, content, owner), fields(size = content.len(), owner = %owner))]
    pub async fn upload(
        &self,
        content: &[u8],
        filename: &str,
        owner: &Principal,
    ) -> UploadOutcome {
        let hash = ContentHash::compute(content);

        match self.index.exists(&hash).await {
            Ok(true) => {
                debug!(%hash, "dedup hit");
                return UploadOutcome::AlreadyExists { hash };
            }
            Ok(false) => {}
            Err(e) => {
                error!(%hash, error = %e, "metadata lookup failed before upload");
                return UploadOutcome::Failure(EngineFailure::MetadataError);
            }
        }

        let mut saga = UploadSaga::new(&*self.blobs, &*self.index, hash, self.compensation);

        if let Err(e) = saga.write_blob(content).await {
            error!(%hash, error = %e, "failed to write blob");
            return UploadOutcome::Failure(EngineFailure::SaveError);
        }

        let record = ContentRecord::new(hash, filename, owner.clone(), content.len() as u64);

        match self.index.insert(&record).await {
            Ok(()) => {
                saga.commit();
                info!(%hash, filename, "content stored");
                UploadOutcome::Created { hash }
            }
            Err(IndexError::DuplicateKey(_)) => {
                // Lost the race to a concurrent uploader. Our blob holds the
                // same bytes as the winner's, so it stays.
                saga.commit();
                debug!(%hash, "lost insert race, treating as dedup hit");
                UploadOutcome::AlreadyExists { hash }
            }
            Err(e) => {
                error!(%hash, error = %e, "failed to insert content record");
                saga.compensate().await;
                UploadOutcome::Failure(EngineFailure::MetadataError)
            }
        }
    }

    /// Look up content for streaming. Never returns a record without its
    /// blob.
    #[instrument(skip(self, hash), fields(hash = %hash))]
    pub async fn download(&self, hash: &ContentHash) -> DownloadOutcome {
        let record = match self.index.find(hash).await {
            Ok(Some(record)) => record,
            Ok(None) => return DownloadOutcome::NotFound,
            Err(e) => {
                error!(error = %e, "metadata lookup failed");
                return DownloadOutcome::Failure(EngineFailure::ReadError);
            }
        };

        match self.blobs.open(hash).await {
            Ok(blob) => DownloadOutcome::Found { record, blob },
            Err(e) if e.is_not_found() => {
                error!(
                    anomaly = "record_without_blob",
                    owner = %record.owner,
                    "integrity anomaly: content record has no blob"
                );
                DownloadOutcome::IntegrityAnomaly { record }
            }
            Err(e) => {
                error!(error = %e, "failed to open blob");
                DownloadOutcome::Failure(EngineFailure::ReadError)
            }
        }
    }

    /// Delete content on behalf of `requester`, who must be its owner.
    #[instrument(skip(self, hash, requester), fields(hash = %hash, requester = %requester))]
    pub async fn delete(&self, hash: &ContentHash, requester: &Principal) -> DeleteOutcome {
        let record = match self.index.find(hash).await {
            Ok(Some(record)) => record,
            Ok(None) => return DeleteOutcome::NotFound,
            Err(e) => {
                error!(error = %e, "metadata lookup failed");
                return DeleteOutcome::Failure(EngineFailure::DeleteError);
            }
        };

        if !record.is_owned_by(requester) {
            debug!("delete refused, requester is not the owner");
            return DeleteOutcome::Unauthorized;
        }

        let blob_was_present = match self.blobs.delete(hash).await {
            Ok(present) => present,
            Err(e) => {
                error!(error = %e, "failed to delete blob, record kept");
                return DeleteOutcome::Failure(EngineFailure::DeleteError);
            }
        };

        if let Err(e) = self.index.delete(hash).await {
            error!(
                error = %e,
                "blob deleted but record removal failed, leaving dangling record for reconciliation"
            );
            return DeleteOutcome::Failure(EngineFailure::DeleteError);
        }

        if !blob_was_present {
            // The record was already dangling; the caller never had a file.
            warn!(
                anomaly = "record_without_blob",
                "removed content record that had no blob"
            );
            return DeleteOutcome::NotFound;
        }

        info!("content deleted");
        DeleteOutcome::Deleted
    }
}
