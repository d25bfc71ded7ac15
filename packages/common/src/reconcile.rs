//! Background repair of the two inconsistencies the engine can leave behind:
//! blobs without a record (failed upload rollback, cancelled upload) and
//! records without a blob (interrupted delete).

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ReconcileConfig;
use crate::engine::StorageEngine;
use crate::index::{IndexError, MetadataIndex};
use crate::storage::{BlobStore, ContentHash, StorageError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("blob store listing failed: {0}")]
    Storage(#[from] StorageError),
    #[error("metadata index listing failed: {0}")]
    Index(#[from] IndexError),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub dangling_records_removed: usize,
    pub orphan_blobs_removed: usize,
    /// Per-item repairs that failed and will be retried next sweep.
    pub errors: usize,
}

/// Run the reconciliation sweep as a background task.
pub async fn run_reconciler(engine: StorageEngine, config: ReconcileConfig) {
    let grace = Duration::from_secs(config.orphan_grace_secs);

    info!(
        interval_secs = config.interval_secs,
        orphan_grace_secs = config.orphan_grace_secs,
        "Starting reconciliation sweep"
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));

    loop {
        interval.tick().await;

        match reconcile_once(&engine, grace).await {
            Ok(stats) if stats == ReconcileStats::default() => debug!("store is consistent"),
            Ok(stats) => info!(
                dangling_records_removed = stats.dangling_records_removed,
                orphan_blobs_removed = stats.orphan_blobs_removed,
                errors = stats.errors,
                "Reconciliation sweep finished"
            ),
            Err(e) => error!(error = %e, "Reconciliation sweep failed"),
        }
    }
}

/// One pass over both stores.
///
/// Orphan blobs younger than `orphan_grace` are skipped: they may belong to
/// an upload that has written its blob but not yet its record.
pub async fn reconcile_once(
    engine: &StorageEngine,
    orphan_grace: Duration,
) -> Result<ReconcileStats, ReconcileError> {
    let mut stats = ReconcileStats::default();

    let indexed: HashSet<ContentHash> = engine.index().list_hashes().await?.into_iter().collect();
    for hash in &indexed {
        remove_if_dangling(engine, hash, &mut stats).await;
    }

    let now = SystemTime::now();
    for entry in engine.blob_store().list().await? {
        if indexed.contains(&entry.hash) {
            continue;
        }
        // A clock that runs backwards makes the blob look brand new.
        let age = now.duration_since(entry.modified).unwrap_or_default();
        if age < orphan_grace {
            continue;
        }
        remove_if_orphan(engine, &entry.hash, &mut stats).await;
    }

    Ok(stats)
}

async fn remove_if_dangling(engine: &StorageEngine, hash: &ContentHash, stats: &mut ReconcileStats) {
    match engine.blob_store().exists(hash).await {
        Ok(true) => {}
        Ok(false) => match engine.index().delete(hash).await {
            Ok(()) => {
                warn!(%hash, anomaly = "record_without_blob", "removed dangling content record");
                stats.dangling_records_removed += 1;
            }
            Err(e) => {
                error!(%hash, error = %e, "failed to remove dangling content record");
                stats.errors += 1;
            }
        },
        Err(e) => {
            error!(%hash, error = %e, "failed to check blob for content record");
            stats.errors += 1;
        }
    }
}

async fn remove_if_orphan(engine: &StorageEngine, hash: &ContentHash, stats: &mut ReconcileStats) {
    // The listing is a snapshot; a record may have been inserted since.
    match engine.index().exists(hash).await {
        Ok(false) => {}
        Ok(true) => return,
        Err(e) => {
            error!(%hash, error = %e, "failed to check record for orphan blob");
            stats.errors += 1;
            return;
        }
    }

    match engine.blob_store().delete(hash).await {
        Ok(removed) => {
            if removed {
                info!(%hash, "removed orphan blob");
                stats.orphan_blobs_removed += 1;
            }
        }
        Err(e) => {
            error!(%hash, error = %e, "failed to remove orphan blob");
            stats.errors += 1;
        }
    }
}
