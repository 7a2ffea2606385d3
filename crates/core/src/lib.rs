//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Versioned cache partitions with SQLite backend
//! - The request cache dispatcher and worker lifecycle
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod worker;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cache::{CacheDb, PartitionStats, Snapshot, SnapshotSummary};
pub use config::{AppConfig, ConfigError, WorkerConfig};
pub use error::Error;
pub use worker::{
    CacheStorage, Event, EventOutcome, Network, Notifier, Request, RequestMode, Response, ResponseSource, Served,
    Worker, WorkerContext, WorkerState,
};
