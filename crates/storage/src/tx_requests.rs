use super::SqliteStore;
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequestRow {
    pub tx_hash: String,
    pub created_at_ms: i64,
    pub last_seen_at_ms: i64,
}

impl SqliteStore {
    pub fn upsert_tx_request(&self, tx_hash: &str, now_ms: i64) -> Result<()> {
        self.write_with_retry(|conn| {
            conn.execute(
                "INSERT INTO tx_requests(tx_hash, created_at_ms, last_seen_at_ms)
                 VALUES (?1, ?2, ?2)
                 ON CONFLICT(tx_hash) DO UPDATE SET last_seen_at_ms = excluded.last_seen_at_ms",
                params![tx_hash, now_ms],
            )
        })
        .with_context(|| format!("failed to upsert tx request {tx_hash}"))?;
        Ok(())
    }

    pub fn touch_tx_request(&self, tx_hash: &str, now_ms: i64) -> Result<()> {
        self.write_with_retry(|conn| {
            conn.execute(
                "UPDATE tx_requests SET last_seen_at_ms = MAX(last_seen_at_ms, ?2) WHERE tx_hash = ?1",
                params![tx_hash, now_ms],
            )
        })
        .with_context(|| format!("failed to touch tx request {tx_hash}"))?;
        Ok(())
    }

    pub fn tx_request(&self, tx_hash: &str) -> Result<Option<TxRequestRow>> {
        self.conn
            .query_row(
                "SELECT tx_hash, created_at_ms, last_seen_at_ms FROM tx_requests WHERE tx_hash = ?1",
                params![tx_hash],
                |row| {
                    Ok(TxRequestRow {
                        tx_hash: row.get(0)?,
                        created_at_ms: row.get(1)?,
                        last_seen_at_ms: row.get(2)?,
                    })
                },
            )
            .optional()
            .with_context(|| format!("failed to read tx request {tx_hash}"))
    }
}
