//! In-memory capabilities for exercising the worker without a network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode, header};
use url::Url;

use crate::Error;
use crate::cache::{CacheDb, PartitionStats, SnapshotSummary};
use crate::config::{AppConfig, WorkerConfig};
use crate::worker::{CacheStorage, Network, Notification, Notifier, Request, Response, WorkerContext};

pub const TEST_ORIGIN: &str = "https://shop.test";

/// Absolute URL on the test origin.
pub fn shop_url(path: &str) -> Url {
    Url::parse(TEST_ORIGIN).and_then(|origin| origin.join(path)).unwrap_or_else(|e| panic!("bad test path {path}: {e}"))
}

pub fn test_app_config() -> AppConfig {
    AppConfig { origin: TEST_ORIGIN.into(), ..Default::default() }
}

/// A context over an in-memory database, returning handles to the fakes.
pub async fn test_parts(app: AppConfig) -> (WorkerContext, Arc<MockNetwork>, Arc<RecordingNotifier>) {
    let config = WorkerConfig::from_app(&app).unwrap_or_else(|e| panic!("invalid test config: {e}"));
    let db = CacheDb::open_in_memory().await.unwrap_or_else(|e| panic!("in-memory db: {e}"));
    let network = Arc::new(MockNetwork::new());
    let notifier = Arc::new(RecordingNotifier::default());

    let ctx = WorkerContext::new(config, Arc::new(db), network.clone(), notifier.clone());
    (ctx, network, notifier)
}

pub async fn test_context() -> (WorkerContext, Arc<MockNetwork>) {
    let (ctx, network, _) = test_parts(test_app_config()).await;
    (ctx, network)
}

/// Scripted network. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct MockNetwork {
    pages: Mutex<HashMap<String, (StatusCode, Bytes)>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<(Method, String)>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` for a path on the test origin.
    pub fn page(&self, path: &str, status: u16, body: &str) {
        self.page_at(shop_url(path), status, body);
    }

    pub fn page_at(&self, url: Url, status: u16, body: &str) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        lock(&self.pages).insert(url.to_string(), (status, Bytes::from(body.to_string())));
    }

    /// Make a path fail with a transport error.
    pub fn fail(&self, path: &str) {
        lock(&self.failing).insert(shop_url(path).to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let key = request.url.to_string();
        lock(&self.calls).push((request.method.clone(), key.clone()));

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Offline(format!("{key}: network unreachable")));
        }
        if lock(&self.failing).contains(&key) {
            return Err(Error::Network(format!("{key}: connection reset")));
        }

        let response = match lock(&self.pages).get(&key) {
            Some((status, body)) => Response::new(request.url.clone(), *status, body.clone())
                .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/html")),
            None => Response::new(request.url.clone(), StatusCode::NOT_FOUND, Bytes::new()),
        };
        Ok(response)
    }
}

/// Notifier that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<Notification>>,
    closed: Mutex<Vec<String>>,
    opened: Mutex<Vec<Url>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<Notification> {
        lock(&self.shown).clone()
    }

    pub fn closed(&self) -> Vec<String> {
        lock(&self.closed).clone()
    }

    pub fn opened(&self) -> Vec<Url> {
        lock(&self.opened).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        lock(&self.shown).push(notification.clone());
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<(), Error> {
        lock(&self.closed).push(tag.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        lock(&self.opened).push(url.clone());
        Ok(())
    }
}

/// Storage whose writes always fail; reads go to the wrapped store.
pub struct ReadOnlyStorage {
    inner: Arc<dyn CacheStorage>,
}

impl ReadOnlyStorage {
    pub fn new(inner: Arc<dyn CacheStorage>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CacheStorage for ReadOnlyStorage {
    async fn open_partition(&self, name: &str) -> Result<(), Error> {
        self.inner.open_partition(name).await
    }

    async fn lookup(&self, partition: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.lookup(partition, request).await
    }

    async fn lookup_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.lookup_any(request).await
    }

    async fn store(&self, partition: &str, _request: &Request, _response: &Response) -> Result<(), Error> {
        Err(Error::InvalidInput(format!("{partition} is read-only")))
    }

    async fn list_partitions(&self) -> Result<Vec<String>, Error> {
        self.inner.list_partitions().await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        self.inner.delete_partition(name).await
    }

    async fn partition_stats(&self, name: &str) -> Result<Option<PartitionStats>, Error> {
        self.inner.partition_stats(name).await
    }

    async fn list_entries(&self, partition: &str) -> Result<Vec<SnapshotSummary>, Error> {
        self.inner.list_entries(partition).await
    }

    async fn record_activation(&self, version: &str) -> Result<(), Error> {
        self.inner.record_activation(version).await
    }

    async fn is_activated(&self, version: &str) -> Result<bool, Error> {
        self.inner.is_activated(version).await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ResponseSource;
    use crate::worker::strategy::respond;

    #[tokio::test]
    async fn test_failed_write_still_serves_response() {
        let (ctx, net) = test_context().await;
        net.page("/product/5", 200, "five");
        let ctx = WorkerContext { storage: Arc::new(ReadOnlyStorage::new(Arc::clone(&ctx.storage))), ..ctx };

        let served = respond(&ctx, Request::get(shop_url("/product/5")), true).await.unwrap();
        assert_eq!(served.source, ResponseSource::Network);
        assert_eq!(served.response.text(), "five");
        assert!(ctx.storage.lookup_any(&Request::get(shop_url("/product/5"))).await.unwrap().is_none());
    }
}
