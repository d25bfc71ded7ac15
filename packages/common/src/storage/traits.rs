use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::hash::ContentHash;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// An opened blob, ready to be streamed back to a client.
pub struct BlobHandle {
    pub reader: BoxReader,
    /// Size in bytes at the time the blob was opened.
    pub size: u64,
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobHandle")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// A stored blob as seen by a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobEntry {
    pub hash: ContentHash,
    pub modified: SystemTime,
}

/// Content-addressed blob storage.
///
/// The store knows nothing about filenames or owners. Callers compute the
/// hash; the store only files bytes under it.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` under `hash`, creating any shard directories needed.
    ///
    /// Writing a hash that is already present leaves the stored content
    /// unchanged in effect.
    async fn put(&self, hash: &ContentHash, data: &[u8]) -> Result<(), StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Open a blob for streaming without buffering it.
    async fn open(&self, hash: &ContentHash) -> Result<BlobHandle, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// List every stored blob.
    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError>;

    /// Read a whole blob into memory.
    async fn read(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let mut handle = self.open(hash).await?;
        let mut buf = Vec::with_capacity(handle.size as usize);
        handle.reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}
