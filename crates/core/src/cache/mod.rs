//! SQLite-backed cache partitions.
//!
//! This module provides the persistent partition store behind the worker's
//! `CacheStorage` capability, using SQLite with async access via
//! tokio-rusqlite. It supports:
//!
//! - Named, versioned partitions created on first use
//! - Request snapshots keyed by SHA-256 of the normalized URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod snapshots;
mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use partitions::PartitionStats;
pub use snapshots::{Snapshot, SnapshotSummary};
