use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use super::error::StorageError;
use super::hash::{ContentHash, SHARD_PREFIX_LEN};
use super::traits::{BlobEntry, BlobHandle, BlobStore};

const TEMP_DIR: &str = ".tmp";

/// Filesystem-backed content-addressed blob store.
///
/// Layout: `{root}/{first 2 hex chars}/{full 64 hex chars}`. Writes land in
/// `{root}/.tmp` first and are renamed into place, so a blob path either does
/// not exist or holds complete content.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Create the store, making the root and temp directories if needed.
    pub async fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(root.join(TEMP_DIR)).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a given content hash.
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.shard_prefix()).join(hash.to_hex())
    }

    fn temp_path(&self) -> PathBuf {
        self.root
            .join(TEMP_DIR)
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_temp(&self, data: &[u8]) -> Result<PathBuf, StorageError> {
        let temp_path = self.temp_path();
        let result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(temp_path)
    }
}

async fn touch(path: &Path) -> std::io::Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::File::options()
            .write(true)
            .open(path)?
            .set_modified(SystemTime::now())
    })
    .await
    .map_err(std::io::Error::other)?
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, hash: &ContentHash, data: &[u8]) -> Result<(), StorageError> {
        let blob_path = self.blob_path(hash);

        // An existing blob may be an old orphan; refreshing its mtime keeps
        // the reconciliation sweep from collecting it under this upload.
        match touch(&blob_path).await {
            Ok(()) => {
                debug!(%hash, "blob already present, skipping write");
                return Ok(());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let temp_path = self.write_temp(data).await?;

        if let Some(parent) = blob_path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        // Concurrent writers of the same hash rename identical bytes; the last
        // rename wins and readers never see a torn file.
        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::metadata(self.blob_path(hash)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, hash: &ContentHash) -> Result<BlobHandle, StorageError> {
        let file = match fs::File::open(self.blob_path(hash)).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(hash.to_hex()));
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok(BlobHandle {
            reader: Box::new(BufReader::new(file)),
            size,
        })
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        match fs::remove_file(self.blob_path(hash)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<BlobEntry>, StorageError> {
        let mut entries = Vec::new();
        let mut shards = fs::read_dir(&self.root).await?;

        while let Some(shard) = shards.next_entry().await? {
            let shard_name = shard.file_name();
            let Some(shard_name) = shard_name.to_str() else {
                continue;
            };
            if shard_name.len() != SHARD_PREFIX_LEN || !shard.file_type().await?.is_dir() {
                continue;
            }

            let mut blobs = fs::read_dir(shard.path()).await?;
            while let Some(blob) = blobs.next_entry().await? {
                let name = blob.file_name();
                let parsed = name
                    .to_str()
                    .and_then(|s| ContentHash::from_hex(s).ok())
                    .filter(|h| h.shard_prefix() == shard_name);
                let Some(hash) = parsed else {
                    warn!(path = %blob.path().display(), "ignoring stray file in blob store");
                    continue;
                };
                let modified = blob.metadata().await?.modified()?;
                entries.push(BlobEntry { hash, modified });
            }
        }

        Ok(entries)
    }
}
