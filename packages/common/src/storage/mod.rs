mod error;
mod hash;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use hash::{ContentHash, HASH_HEX_LEN, SHARD_PREFIX_LEN};
pub use traits::{BlobEntry, BlobHandle, BlobStore, BoxReader};
