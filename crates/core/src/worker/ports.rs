//! Platform capabilities the worker runs against.
//!
//! The dispatcher never touches SQLite, sockets or a notification tray
//! directly; hosts hand it implementations of these traits.

use async_trait::async_trait;
use url::Url;

use super::push::Notification;
use super::request::{Request, Response};
use crate::Error;
use crate::cache::{PartitionStats, SnapshotSummary};

/// Named partition store.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if it is missing.
    async fn open_partition(&self, name: &str) -> Result<(), Error>;

    /// Look the request up in one partition.
    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look the request up in every partition, newest snapshot wins.
    async fn lookup_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Insert or overwrite the entry for `request`.
    async fn store(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Store several entries; implementations should make this all-or-nothing.
    async fn store_all(&self, partition: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        for (request, response) in entries {
            self.store(partition, request, response).await?;
        }
        Ok(())
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error>;

    /// Returns true if the partition existed.
    async fn delete_partition(&self, name: &str) -> Result<bool, Error>;

    async fn partition_stats(&self, name: &str) -> Result<Option<PartitionStats>, Error>;

    /// Entries of one partition, oldest first.
    async fn list_entries(&self, partition: &str) -> Result<Vec<SnapshotSummary>, Error>;

    /// Remember that `version` has activated, so a restarted host resumes it
    /// in control.
    async fn record_activation(&self, version: &str) -> Result<(), Error>;

    async fn is_activated(&self, version: &str) -> Result<bool, Error>;
}

/// A single network attempt. Non-2xx answers are responses, not errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Notification tray and window control.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<(), Error>;

    async fn close(&self, tag: &str) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}
