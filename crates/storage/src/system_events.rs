use super::SqliteStore;
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

impl SqliteStore {
    pub fn record_heartbeat(&self, component: &str, status: &str) -> Result<()> {
        let ts = Utc::now().to_rfc3339();
        self.write_with_retry(|conn| {
            conn.execute(
                "INSERT INTO system_heartbeat(component, ts, status) VALUES (?1, ?2, ?3)",
                params![component, ts, status],
            )
        })
        .context("failed to record heartbeat")?;
        Ok(())
    }

    pub fn last_heartbeat(&self, component: &str) -> Result<Option<(String, String)>> {
        self.conn
            .query_row(
                "SELECT ts, status FROM system_heartbeat
                 WHERE component = ?1
                 ORDER BY id DESC
                 LIMIT 1",
                params![component],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("failed to read last heartbeat")
    }
}
