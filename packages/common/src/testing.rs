//! Fault-injecting wrappers around the storage backends, for exercising the
//! engine's failure paths.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use crate::index::{ContentRecord, IndexError, MemoryMetadataIndex, MetadataIndex, Principal};
use crate::storage::{BlobEntry, BlobHandle, BlobStore, ContentHash, StorageError};

/// Counts down remaining injected failures. `u32::MAX` fails forever.
#[derive(Debug, Default)]
pub struct FailureBudget(AtomicU32);

impl FailureBudget {
    pub fn set(&self, times: u32) {
        self.0.store(times, Ordering::SeqCst);
    }

    pub fn always(&self) {
        self.set(u32::MAX);
    }

    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

fn injected() -> io::Error {
    io::Error::other("injected failure")
}

/// Blob store wrapper whose operations can be made to fail on demand.
pub struct FaultyBlobStore<B> {
    pub inner: B,
    pub fail_put: FailureBudget,
    pub fail_open: FailureBudget,
    pub fail_delete: FailureBudget,
    pub delete_calls: AtomicU32,
}

impl<B: BlobStore> FaultyBlobStore<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fail_put: FailureBudget::default(),
            fail_open: FailureBudget::default(),
            fail_delete: FailureBudget::default(),
            delete_calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl<B: BlobStore> BlobStore for FaultyBlobStore<B> {
    async fn put(&self, hash: &ContentHash, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_put.take() {
            return Err(injected().into());
        }
        self.inner.put(hash, data).await
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        self.inner.exists(hash).await
    }

    async fn open(&self, hash: &ContentHash) -> Result<BlobHandle, StorageError> {
        if self.fail_open.take() {
            return Err(injected().into());
        }
        self.inner.open(hash).await
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.take() {
            return Err(injected().into());
        }
        self.inner.delete(hash).await
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError> {
        self.inner.list().await
    }
}

/// In-memory index whose operations can be made to fail on demand.
#[derive(Default)]
pub struct FaultyIndex {
    pub inner: MemoryMetadataIndex,
    pub fail_find: FailureBudget,
    pub fail_insert: FailureBudget,
    pub fail_delete: FailureBudget,
    /// When set, the next insert finds that this principal inserted the same
    /// hash a moment earlier, as if a concurrent upload had won the race.
    /// The winner's record lands even if `fail_insert` then fails this insert.
    pub race_winner: Mutex<Option<Principal>>,
}

impl FaultyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lose_next_insert_to(&self, winner: impl Into<Principal>) {
        if let Ok(mut slot) = self.race_winner.lock() {
            *slot = Some(winner.into());
        }
    }
}

fn backend() -> IndexError {
    IndexError::Backend("injected failure".into())
}

#[async_trait]
impl MetadataIndex for FaultyIndex {
    async fn find(&self, hash: &ContentHash) -> Result<Option<ContentRecord>, IndexError> {
        if self.fail_find.take() {
            return Err(backend());
        }
        self.inner.find(hash).await
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, IndexError> {
        if self.fail_find.take() {
            return Err(backend());
        }
        self.inner.exists(hash).await
    }

    async fn insert(&self, record: &ContentRecord) -> Result<(), IndexError> {
        let winner = self
            .race_winner
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(winner) = winner {
            let mut theirs = record.clone();
            theirs.owner = winner;
            self.inner.insert(&theirs).await?;
        }
        if self.fail_insert.take() {
            return Err(backend());
        }
        self.inner.insert(record).await
    }

    async fn delete(&self, hash: &ContentHash) -> Result<(), IndexError> {
        if self.fail_delete.take() {
            return Err(backend());
        }
        self.inner.delete(hash).await
    }

    async fn list_hashes(&self) -> Result<Vec<ContentHash>, IndexError> {
        self.inner.list_hashes().await
    }
}
