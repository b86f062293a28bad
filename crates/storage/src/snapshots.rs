use super::SqliteStore;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, Row};
use txadvisor_core_types::{LifecycleStatus, Snapshot, SnapshotMeta, SnapshotSource};

struct SnapshotRow {
    tx_hash: String,
    ts_ms: i64,
    source: String,
    normalized: String,
    raw_json: String,
    rpc_method: Option<String>,
    rpc_url: Option<String>,
}

impl SnapshotRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            tx_hash: row.get(0)?,
            ts_ms: row.get(1)?,
            source: row.get(2)?,
            normalized: row.get(3)?,
            raw_json: row.get(4)?,
            rpc_method: row.get(5)?,
            rpc_url: row.get(6)?,
        })
    }

    fn into_snapshot(self) -> Result<Snapshot> {
        let source: SnapshotSource = self
            .source
            .parse()
            .map_err(|error: String| anyhow!(error))
            .with_context(|| format!("invalid snapshot source for {}", self.tx_hash))?;
        let normalized: LifecycleStatus = self
            .normalized
            .parse()
            .map_err(|error: String| anyhow!(error))
            .with_context(|| format!("invalid normalized status for {}", self.tx_hash))?;
        let raw = serde_json::from_str(&self.raw_json)
            .with_context(|| format!("invalid raw_json for {} at {}", self.tx_hash, self.ts_ms))?;
        let meta = if self.rpc_method.is_none() && self.rpc_url.is_none() {
            None
        } else {
            Some(SnapshotMeta {
                method: self.rpc_method,
                rpc_url: self.rpc_url,
            })
        };
        Ok(Snapshot {
            tx_hash: self.tx_hash,
            timestamp: self.ts_ms,
            source,
            normalized,
            raw,
            meta,
        })
    }
}

fn insert_row(conn: &Connection, snapshot: &Snapshot, raw_json: &str) -> rusqlite::Result<i64> {
    let (rpc_method, rpc_url) = snapshot
        .meta
        .as_ref()
        .map(|meta| (meta.method.as_deref(), meta.rpc_url.as_deref()))
        .unwrap_or((None, None));
    conn.execute(
        "INSERT INTO tx_snapshots(
            tx_hash, ts_ms, source, normalized, raw_json, rpc_method, rpc_url
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            snapshot.tx_hash,
            snapshot.timestamp,
            snapshot.source.as_str(),
            snapshot.normalized.as_str(),
            raw_json,
            rpc_method,
            rpc_url,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl SqliteStore {
    pub fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<i64> {
        let raw_json = serde_json::to_string(&snapshot.raw)
            .context("failed to serialize snapshot raw payload")?;
        self.write_with_retry(|conn| insert_row(conn, snapshot, &raw_json))
            .with_context(|| format!("failed to insert snapshot for {}", snapshot.tx_hash))
    }

    /// Appends a batch in one transaction: either every row lands or none does.
    pub fn insert_snapshots(&self, snapshots: &[Snapshot]) -> Result<usize> {
        let encoded = snapshots
            .iter()
            .map(|snapshot| serde_json::to_string(&snapshot.raw).map(|raw| (snapshot, raw)))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to serialize snapshot raw payload")?;
        self.write_with_retry(|conn| {
            let tx = conn.unchecked_transaction()?;
            for (snapshot, raw_json) in &encoded {
                insert_row(&tx, snapshot, raw_json)?;
            }
            tx.commit()?;
            Ok(encoded.len())
        })
        .context("failed to insert snapshot batch")
    }

    pub fn list_snapshots(&self, tx_hash: &str) -> Result<Vec<Snapshot>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT tx_hash, ts_ms, source, normalized, raw_json, rpc_method, rpc_url
                 FROM tx_snapshots
                 WHERE tx_hash = ?1
                 ORDER BY ts_ms ASC, id ASC",
            )
            .context("failed to prepare snapshot list query")?;
        let rows = stmt
            .query_map(params![tx_hash], SnapshotRow::from_row)
            .context("failed to query snapshots")?;

        let mut snapshots = Vec::new();
        for row in rows {
            let row = row.context("failed to read snapshot row")?;
            snapshots.push(row.into_snapshot()?);
        }
        Ok(snapshots)
    }

    pub fn latest_snapshot_ts(&self, tx_hash: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT MAX(ts_ms) FROM tx_snapshots WHERE tx_hash = ?1",
                params![tx_hash],
                |row| row.get(0),
            )
            .context("failed to read latest snapshot timestamp")
    }
}
