//! Request classification.
//!
//! Classification is total and pure: the decision depends only on the
//! method, the origin and the path string.

use http::Method;
use serde::{Deserialize, Serialize};

use super::request::Request;
use crate::config::WorkerConfig;

/// Which partition a route reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Static,
    Dynamic,
}

impl Partition {
    pub fn name(self, config: &WorkerConfig) -> &str {
        match self {
            Partition::Static => &config.static_cache,
            Partition::Dynamic => &config.dynamic_cache,
        }
    }
}

/// Which source is consulted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

/// The rule that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    Shell,
    Product,
    Api,
    Asset,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub kind: RouteKind,
    pub partition: Partition,
    pub strategy: Strategy,
}

impl Route {
    const fn new(kind: RouteKind, partition: Partition, strategy: Strategy) -> Self {
        Self { kind, partition, strategy }
    }
}

/// Why a request is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    NotGet,
    CrossOrigin,
    NotControlled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    PassThrough(PassReason),
    Handle(Route),
}

/// Classify a same-origin path.
pub fn classify_path(config: &WorkerConfig, path: &str) -> Route {
    if config.is_precached(path) {
        return Route::new(RouteKind::Shell, Partition::Static, Strategy::CacheFirst);
    }
    if path.starts_with(&config.product_prefix) {
        return Route::new(RouteKind::Product, Partition::Dynamic, Strategy::NetworkFirst);
    }
    if path.starts_with(&config.api_prefix) {
        return Route::new(RouteKind::Api, Partition::Dynamic, Strategy::NetworkFirst);
    }
    if config.cache_first_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
        return Route::new(RouteKind::Asset, Partition::Dynamic, Strategy::CacheFirst);
    }
    Route::new(RouteKind::Default, Partition::Dynamic, Strategy::NetworkFirst)
}

/// Decide whether and how to intercept a request.
pub fn classify(config: &WorkerConfig, request: &Request) -> Decision {
    if request.method != Method::GET {
        return Decision::PassThrough(PassReason::NotGet);
    }
    if !request.is_same_origin(&config.origin) {
        return Decision::PassThrough(PassReason::CrossOrigin);
    }
    Decision::Handle(classify_path(config, request.url.path()))
}
