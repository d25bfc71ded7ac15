use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::error::IndexError;
use super::record::ContentRecord;
use super::traits::MetadataIndex;
use crate::storage::ContentHash;

/// Process-local index backed by a sharded concurrent map.
///
/// Insert-if-absent goes through the map's entry API, which holds the shard
/// lock for the check and the write, so concurrent inserts of one hash are
/// totally ordered.
#[derive(Debug, Default)]
pub struct MemoryMetadataIndex {
    records: DashMap<ContentHash, ContentRecord>,
}

impl MemoryMetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetadataIndex for MemoryMetadataIndex {
    async fn find(&self, hash: &ContentHash) -> Result<Option<ContentRecord>, IndexError> {
        Ok(self.records.get(hash).map(|r| r.value().clone()))
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, IndexError> {
        Ok(self.records.contains_key(hash))
    }

    async fn insert(&self, record: &ContentRecord) -> Result<(), IndexError> {
        match self.records.entry(record.hash) {
            Entry::Occupied(_) => Err(IndexError::DuplicateKey(record.hash)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn delete(&self, hash: &ContentHash) -> Result<(), IndexError> {
        self.records.remove(hash);
        Ok(())
    }

    async fn list_hashes(&self) -> Result<Vec<ContentHash>, IndexError> {
        Ok(self.records.iter().map(|r| *r.key()).collect())
    }
}
