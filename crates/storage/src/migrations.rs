use super::SqliteStore;
use anyhow::{anyhow, Context, Result};
use rusqlite::{params, OptionalExtension, Transaction};
use std::fs;
use std::path::{Path, PathBuf};

impl SqliteStore {
    pub fn run_migrations(&mut self, migrations_dir: &Path) -> Result<usize> {
        if !migrations_dir.is_dir() {
            return Err(anyhow!(
                "migrations directory not found: {}",
                migrations_dir.display()
            ));
        }

        let files = list_sql_files(migrations_dir)?;
        let tx = self
            .conn
            .transaction()
            .context("failed to open sqlite migration transaction")?;

        let mut applied = 0usize;
        for path in files {
            let version = migration_version(&path)?;
            if is_applied(&tx, version)? {
                continue;
            }
            let sql = fs::read_to_string(&path)
                .with_context(|| format!("failed reading migration file {}", path.display()))?;
            tx.execute_batch(&sql)
                .with_context(|| format!("failed applying migration {version}"))?;
            tx.execute(
                "INSERT INTO schema_migrations(version, applied_at) VALUES (?1, datetime('now'))",
                params![version],
            )
            .with_context(|| format!("failed recording migration {version}"))?;
            applied += 1;
            tracing::info!(version, "migration applied");
        }

        tx.commit().context("failed to commit migrations")?;
        Ok(applied)
    }
}

fn list_sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read migrations dir {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", dir.display()))?
            .path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn migration_version(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("invalid migration filename: {}", path.display()))
}

fn is_applied(tx: &Transaction<'_>, version: &str) -> Result<bool> {
    let existing: Option<String> = tx
        .query_row(
            "SELECT version FROM schema_migrations WHERE version = ?1",
            params![version],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("failed checking migration {version}"))?;
    Ok(existing.is_some())
}
