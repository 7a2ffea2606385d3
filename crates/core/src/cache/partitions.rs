//! Partition lifecycle operations.

use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::snapshots::timestamp;
use crate::Error;

/// Size and age of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PartitionStats {
    pub name: String,
    pub entries: u64,
    pub bytes: u64,
    pub created_at: String,
}

impl CacheDb {
    /// Create a partition if it does not exist yet.
    ///
    /// Returns true when the partition was created by this call.
    pub async fn create_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        let created_at = timestamp();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// List partition names in creation order.
    pub async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt.query_map([], |row| row.get(0))?;
                Ok(names.collect::<Result<Vec<String>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and every snapshot in it.
    ///
    /// Returns true if the partition existed.
    pub async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE partition = ?1", params![name])?;
                let deleted = tx.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Record that `version` finished activating. Idempotent.
    pub async fn record_activation(&self, version: &str) -> Result<(), Error> {
        let version = version.to_string();
        let activated_at = timestamp();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO activations (version, activated_at) VALUES (?1, ?2)",
                    params![version, activated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn is_activated(&self, version: &str) -> Result<bool, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let found: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM activations WHERE version = ?1)",
                    params![version],
                    |row| row.get(0),
                )?;
                Ok(found)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry count and body bytes for one partition.
    ///
    /// Returns None if the partition does not exist.
    pub async fn partition_stats(&self, name: &str) -> Result<Option<PartitionStats>, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<Option<PartitionStats>, Error> {
                let result = conn.query_row(
                    "SELECT p.name, COUNT(e.key_hash), COALESCE(SUM(LENGTH(e.body)), 0), p.created_at
                     FROM partitions p LEFT JOIN entries e ON e.partition = p.name
                     WHERE p.name = ?1
                     GROUP BY p.name",
                    params![name],
                    |row| {
                        Ok(PartitionStats {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            bytes: row.get::<_, i64>(2)? as u64,
                            created_at: row.get(3)?,
                        })
                    },
                );

                match result {
                    Ok(stats) => Ok(Some(stats)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }
}
