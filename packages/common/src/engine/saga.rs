use tracing::{error, info, warn};

use crate::index::MetadataIndex;
use crate::retry::RetryPolicy;
use crate::storage::{BlobStore, ContentHash, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compensation {
    RemoveBlob,
}

/// Forward/compensating action pair for the two-store upload write.
///
/// Each forward step that succeeds records how to undo it. `commit` drops the
/// record; `compensate` replays it in reverse. If the task is cancelled before
/// either runs, the blob is left for the reconciliation sweep.
pub(crate) struct UploadSaga<'a> {
    blobs: &'a dyn BlobStore,
    index: &'a dyn MetadataIndex,
    hash: ContentHash,
    policy: RetryPolicy,
    pending: Vec<Compensation>,
}

impl<'a> UploadSaga<'a> {
    pub(crate) fn new(
        blobs: &'a dyn BlobStore,
        index: &'a dyn MetadataIndex,
        hash: ContentHash,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            blobs,
            index,
            hash,
            policy,
            pending: Vec::new(),
        }
    }

    pub(crate) async fn write_blob(&mut self, content: &[u8]) -> Result<(), StorageError> {
        self.blobs.put(&self.hash, content).await?;
        self.pending.push(Compensation::RemoveBlob);
        Ok(())
    }

    pub(crate) fn commit(mut self) {
        self.pending.clear();
    }

    /// Undo every recorded step. Returns `false` if any compensation failed.
    pub(crate) async fn compensate(mut self) -> bool {
        let mut clean = true;
        while let Some(action) = self.pending.pop() {
            match action {
                Compensation::RemoveBlob => clean &= self.remove_blob().await,
            }
        }
        clean
    }

    async fn remove_blob(&self) -> bool {
        let hash = self.hash;

        // A concurrent uploader of the same content may have inserted its
        // record after our insert failed; its record now points at this blob.
        if let Ok(true) = self.index.exists(&hash).await {
            info!(%hash, "blob is referenced by a concurrent upload, keeping it");
            return true;
        }

        let result = self
            .policy
            .run("compensating blob delete", || self.blobs.delete(&hash))
            .await;

        match result {
            Ok(_) => {
                info!(%hash, "rolled back blob write");
                true
            }
            Err(e) => {
                error!(
                    %hash,
                    error = %e,
                    "failed to roll back blob write, leaving orphan for reconciliation"
                );
                false
            }
        }
    }
}

impl Drop for UploadSaga<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                hash = %self.hash,
                pending = self.pending.len(),
                "upload saga dropped with pending compensations"
            );
        }
    }
}
