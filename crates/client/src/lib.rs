//! Platform capabilities for swcache hosts.
//!
//! This crate provides the reqwest-backed network used by the server and
//! CLI, plus the stand-in capabilities for running without a network or a
//! notification tray.

pub mod fetch;
pub mod notify;

pub use fetch::{FetchClient, FetchConfig, OfflineNetwork};
pub use notify::LogNotifier;
