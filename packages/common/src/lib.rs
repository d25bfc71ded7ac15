pub mod config;
pub mod engine;
pub mod index;
pub mod reconcile;
pub mod retry;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::{DeleteOutcome, DownloadOutcome, EngineFailure, StorageEngine, UploadOutcome};
