//! Schema migrations.
//!
//! Applied versions are recorded in `_migrations`; pending ones run in
//! ascending order inside a single transaction.

use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;
use super::snapshots::timestamp;

/// Ordered schema steps.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_partitions.sql")),
    (2, include_str!("../../migrations/002_entry_lookup.sql")),
    (3, include_str!("../../migrations/003_activations.sql")),
];

/// Apply every migration newer than the recorded schema version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    let applied = conn
        .call(|conn| -> Result<Vec<i64>, Error> {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    applied_at TEXT NOT NULL
                )",
            )?;

            let current = current_version(conn)?;
            let pending: Vec<&(i64, &str)> = MIGRATIONS.iter().filter(|(v, _)| *v > current).collect();
            if pending.is_empty() {
                return Ok(Vec::new());
            }

            let tx = conn.transaction()?;
            for (version, sql) in &pending {
                tx.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
                tx.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version, timestamp()],
                )?;
            }
            tx.commit()?;

            Ok(pending.iter().map(|(v, _)| *v).collect())
        })
        .await
        .map_err(Error::from)?;

    if !applied.is_empty() {
        tracing::info!(?applied, "applied schema migrations");
    }
    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub async fn schema_version(conn: &Connection) -> Result<i64, Error> {
    conn.call(|conn| -> Result<i64, Error> { current_version(conn) })
        .await
        .map_err(Error::from)
}

fn current_version(conn: &rusqlite::Connection) -> Result<i64, Error> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='_migrations')",
        [],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(0);
    }
    Ok(conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?)
}
