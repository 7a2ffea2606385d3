//! Snapshot CRUD operations.
//!
//! A snapshot is the stored copy of one successful response. It is written
//! whole and overwritten whole; there are no partial updates.

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

use super::connection::CacheDb;
use crate::Error;
use crate::worker::{Request, Response};

/// A cached response snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub partition: String,
    pub key_hash: String,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub headers_json: String,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// Lightweight listing row for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub url: String,
    pub status_code: u16,
    pub bytes: u64,
    pub stored_at: String,
}

pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

const SNAPSHOT_COLUMNS: &str = "partition, key_hash, url, status_code, content_type, headers_json, body, stored_at";

fn read_snapshot(row: &rusqlite::Row<'_>) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        partition: row.get(0)?,
        key_hash: row.get(1)?,
        url: row.get(2)?,
        status_code: row.get(3)?,
        content_type: row.get(4)?,
        headers_json: row.get(5)?,
        body: row.get(6)?,
        stored_at: row.get(7)?,
    })
}

fn write_snapshot(conn: &rusqlite::Connection, snapshot: &Snapshot) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)",
        params![&snapshot.partition, &snapshot.stored_at],
    )?;
    conn.execute(
        "INSERT INTO entries (
            partition, key_hash, url, status_code, content_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(partition, key_hash) DO UPDATE SET
            url = excluded.url,
            status_code = excluded.status_code,
            content_type = excluded.content_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            &snapshot.partition,
            &snapshot.key_hash,
            &snapshot.url,
            snapshot.status_code,
            &snapshot.content_type,
            &snapshot.headers_json,
            &snapshot.body,
            &snapshot.stored_at,
        ],
    )?;
    Ok(())
}

impl Snapshot {
    /// Capture a response for `request` into `partition`.
    ///
    /// The entry is keyed by the request but records the final response URL.
    pub fn capture(partition: &str, request: &Request, response: &Response) -> Self {
        let headers: Vec<(&str, &str)> = response
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();

        Self {
            partition: partition.to_string(),
            key_hash: request.key(),
            url: response.url.to_string(),
            status_code: response.status.as_u16(),
            content_type: response.content_type().map(str::to_string),
            headers_json: serde_json::to_string(&headers).unwrap_or_else(|_| "[]".into()),
            body: response.body.to_vec(),
            stored_at: timestamp(),
        }
    }

    /// Rebuild the response this snapshot was captured from.
    pub fn into_response(self) -> Result<Response, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::CorruptSnapshot(format!("{}: {e}", self.url)))?;
        let status = StatusCode::from_u16(self.status_code)
            .map_err(|e| Error::CorruptSnapshot(format!("status {}: {e}", self.status_code)))?;
        let pairs: Vec<(String, String)> =
            serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptSnapshot(e.to_string()))?;

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!("dropping unreadable header {name} from snapshot {}", self.url),
            }
        }

        Ok(Response { url, status, headers, body: Bytes::from(self.body) })
    }
}

impl CacheDb {
    /// Insert or overwrite a snapshot, creating its partition if needed.
    pub async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), Error> {
        let snapshot = snapshot.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { write_snapshot(conn, &snapshot) })
            .await
            .map_err(Error::from)
    }

    /// Write a batch of snapshots in one transaction: all land or none do.
    pub async fn put_snapshots(&self, snapshots: Vec<Snapshot>) -> Result<(), Error> {
        if snapshots.is_empty() {
            return Ok(());
        }
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for snapshot in &snapshots {
                    write_snapshot(&tx, snapshot)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a snapshot from one partition.
    ///
    /// Returns None if the partition has no entry for the key.
    pub async fn get_snapshot(&self, partition: &str, key_hash: &str) -> Result<Option<Snapshot>, Error> {
        let partition = partition.to_string();
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM entries WHERE partition = ?1 AND key_hash = ?2"
                ))?;

                match stmt.query_row(params![partition, key_hash], read_snapshot) {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Get the most recently stored snapshot for a key across all partitions.
    pub async fn find_latest_snapshot(&self, key_hash: &str) -> Result<Option<Snapshot>, Error> {
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Snapshot>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM entries WHERE key_hash = ?1
                     ORDER BY stored_at DESC, rowid DESC LIMIT 1"
                ))?;

                match stmt.query_row(params![key_hash], read_snapshot) {
                    Ok(s) => Ok(Some(s)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// List the entries of a partition, oldest first.
    pub async fn list_snapshots(&self, partition: &str) -> Result<Vec<SnapshotSummary>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<SnapshotSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, LENGTH(body), stored_at FROM entries
                     WHERE partition = ?1 ORDER BY stored_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![partition], |row| {
                    Ok(SnapshotSummary {
                        url: row.get(0)?,
                        status_code: row.get(1)?,
                        bytes: row.get::<_, i64>(2)? as u64,
                        stored_at: row.get(3)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(Error::from)
    }
}
