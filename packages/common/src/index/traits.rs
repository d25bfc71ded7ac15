use async_trait::async_trait;

use super::error::IndexError;
use super::record::ContentRecord;
use crate::storage::ContentHash;

/// Durable mapping from content hash to [`ContentRecord`], with the hash as a
/// uniqueness constraint.
///
/// Every write is atomic for a single record. Implementations must be safe to
/// call from many tasks at once without outside locking.
#[async_trait]
pub trait MetadataIndex: Send + Sync {
    async fn find(&self, hash: &ContentHash) -> Result<Option<ContentRecord>, IndexError>;

    async fn exists(&self, hash: &ContentHash) -> Result<bool, IndexError> {
        Ok(self.find(hash).await?.is_some())
    }

    /// Insert a record if none exists for its hash.
    ///
    /// Fails with [`IndexError::DuplicateKey`] when one does; the existing
    /// record is left untouched.
    async fn insert(&self, record: &ContentRecord) -> Result<(), IndexError>;

    /// Remove the record for `hash`. Removing an absent record is not an
    /// error.
    async fn delete(&self, hash: &ContentHash) -> Result<(), IndexError>;

    /// Every hash that currently has a record.
    async fn list_hashes(&self) -> Result<Vec<ContentHash>, IndexError>;
}
