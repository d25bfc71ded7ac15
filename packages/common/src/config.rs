use std::path::PathBuf;

use serde::Deserialize;

use crate::retry::RetryPolicy;

/// Blob storage and engine configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Root directory of the blob store. Default: "./store".
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Largest accepted upload body in bytes. Default: 128 MiB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
    /// Retries of the compensating blob delete after a failed metadata
    /// insert. Default: 2.
    #[serde(default = "default_compensation_retries")]
    pub compensation_retries: u8,
    #[serde(default = "default_compensation_base_delay_ms")]
    pub compensation_base_delay_ms: u64,
    #[serde(default = "default_compensation_max_delay_ms")]
    pub compensation_max_delay_ms: u64,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./store")
}
fn default_max_upload_size() -> u64 {
    128 * 1024 * 1024
}
fn default_compensation_retries() -> u8 {
    2
}
fn default_compensation_base_delay_ms() -> u64 {
    50
}
fn default_compensation_max_delay_ms() -> u64 {
    1_000
}

impl StorageConfig {
    pub fn compensation_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.compensation_retries,
            base_delay_ms: self.compensation_base_delay_ms,
            max_delay_ms: self.compensation_max_delay_ms,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            max_upload_size: default_max_upload_size(),
            compensation_retries: default_compensation_retries(),
            compensation_base_delay_ms: default_compensation_base_delay_ms(),
            compensation_max_delay_ms: default_compensation_max_delay_ms(),
        }
    }
}

/// Consistency-repair sweep configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    /// Whether the background sweep runs. Default: true.
    #[serde(default = "default_reconcile_enabled")]
    pub enabled: bool,
    /// Seconds between sweeps. Default: 300.
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,
    /// Blobs without a record are only removed once they are at least this
    /// old, so uploads between blob write and record insert are left alone.
    /// Default: 600.
    #[serde(default = "default_orphan_grace_secs")]
    pub orphan_grace_secs: u64,
}

fn default_reconcile_enabled() -> bool {
    true
}
fn default_reconcile_interval_secs() -> u64 {
    300
}
fn default_orphan_grace_secs() -> u64 {
    600
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconcile_enabled(),
            interval_secs: default_reconcile_interval_secs(),
            orphan_grace_secs: default_orphan_grace_secs(),
        }
    }
}
