use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use txadvisor_core_types::Snapshot;
use txadvisor_storage::SqliteStore;

pub trait SnapshotSink: Send + Sync {
    fn record_request(&self, tx_hash: &str, now_ms: i64) -> Result<()>;
    fn touch_request(&self, tx_hash: &str, now_ms: i64) -> Result<()>;
    fn latest_timestamp(&self, tx_hash: &str) -> Result<Option<i64>>;
    fn append(&self, snapshots: &[Snapshot]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct SqliteSnapshotSink {
    sqlite_path: PathBuf,
}

impl SqliteSnapshotSink {
    pub fn new(sqlite_path: impl Into<PathBuf>) -> Self {
        Self {
            sqlite_path: sqlite_path.into(),
        }
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    fn open(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.sqlite_path).with_context(|| {
            format!(
                "failed to open sqlite db for watcher: {}",
                self.sqlite_path.display()
            )
        })
    }
}

impl SnapshotSink for SqliteSnapshotSink {
    fn record_request(&self, tx_hash: &str, now_ms: i64) -> Result<()> {
        self.open()?.upsert_tx_request(tx_hash, now_ms)
    }

    fn touch_request(&self, tx_hash: &str, now_ms: i64) -> Result<()> {
        self.open()?.touch_tx_request(tx_hash, now_ms)
    }

    fn latest_timestamp(&self, tx_hash: &str) -> Result<Option<i64>> {
        self.open()?.latest_snapshot_ts(tx_hash)
    }

    fn append(&self, snapshots: &[Snapshot]) -> Result<()> {
        self.open()?.insert_snapshots(snapshots)?;
        Ok(())
    }
}
