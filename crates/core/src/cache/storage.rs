//! `CacheStorage` capability backed by SQLite.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::partitions::PartitionStats;
use super::snapshots::{Snapshot, SnapshotSummary};
use crate::Error;
use crate::worker::{CacheStorage, Request, Response};

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open_partition(&self, name: &str) -> Result<(), Error> {
        if self.create_partition(name).await? {
            tracing::debug!(partition = name, "created partition");
        }
        Ok(())
    }

    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.get_snapshot(partition, &request.key())
            .await?
            .map(Snapshot::into_response)
            .transpose()
    }

    async fn lookup_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.find_latest_snapshot(&request.key())
            .await?
            .map(Snapshot::into_response)
            .transpose()
    }

    async fn store(&self, partition: &str, request: &Request, response: &Response) -> Result<(), Error> {
        self.put_snapshot(&Snapshot::capture(partition, request, response)).await
    }

    async fn store_all(&self, partition: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let snapshots = entries
            .iter()
            .map(|(request, response)| Snapshot::capture(partition, request, response))
            .collect();
        self.put_snapshots(snapshots).await
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        CacheDb::list_partitions(self).await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        CacheDb::delete_partition(self, name).await
    }

    async fn partition_stats(&self, name: &str) -> Result<Option<PartitionStats>, Error> {
        CacheDb::partition_stats(self, name).await
    }

    async fn list_entries(&self, partition: &str) -> Result<Vec<SnapshotSummary>, Error> {
        self.list_snapshots(partition).await
    }

    async fn record_activation(&self, version: &str) -> Result<(), Error> {
        CacheDb::record_activation(self, version).await
    }

    async fn is_activated(&self, version: &str) -> Result<bool, Error> {
        CacheDb::is_activated(self, version).await
    }
}
