//! The request cache dispatcher.
//!
//! A [`Worker`] owns the lifecycle state and routes every platform event to
//! its handler. All I/O goes through the capabilities in [`WorkerContext`].

pub mod batch;
pub mod classify;
pub mod lifecycle;
pub mod message;
pub mod ports;
pub mod push;
pub mod request;
pub mod strategy;
pub mod sync;
pub mod url;

use std::sync::Arc;

use ::url::Url;
use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Error;
use crate::config::WorkerConfig;

pub use batch::{BatchFailure, BatchMode, BatchReport};
pub use classify::{Partition, RouteKind, Strategy};
pub use lifecycle::{ActivateReport, InstallReport};
pub use message::{CacheStatus, Message, MessageReply};
pub use ports::{CacheStorage, Network, Notifier};
pub use push::{Notification, NotificationData, PushPayload};
pub use request::{Request, RequestMode, Response, ResponseSource, Served};
pub use sync::SyncOutcome;

/// Lifecycle position of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Constructed, nothing precached yet.
    Parsed,
    /// Static partition populated; waiting to take control.
    Installed,
    /// Controlling clients; fetches are intercepted.
    Activated,
}

/// Configuration plus the capabilities a worker runs against.
#[derive(Clone)]
pub struct WorkerContext {
    pub config: Arc<WorkerConfig>,
    pub storage: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub notifier: Arc<dyn Notifier>,
}

impl WorkerContext {
    pub fn new(
        config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { config: Arc::new(config), storage, network, notifier }
    }
}

/// Events delivered by the host platform.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    Push { data: Option<Bytes> },
    NotificationClick(Notification),
    Message(Message),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Install => "install",
            Event::Activate => "activate",
            Event::Fetch(_) => "fetch",
            Event::Sync { .. } => "sync",
            Event::Push { .. } => "push",
            Event::NotificationClick(_) => "notificationclick",
            Event::Message(_) => "message",
        }
    }
}

#[derive(Debug, Clone)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Response(Served),
    Synced(SyncOutcome),
    NotificationShown(Notification),
    NotificationClicked { opened: Option<Url> },
    Reply(MessageReply),
}

/// Event dispatcher with lifecycle state.
pub struct Worker {
    ctx: WorkerContext,
    state: RwLock<WorkerState>,
}

impl Worker {
    /// A fresh worker that has not installed yet.
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx, state: RwLock::new(WorkerState::Parsed) }
    }

    /// Pick up where an earlier run against the same store left off, as a
    /// restarted host would. Only a recorded activation puts the worker back
    /// in control; a present static partition alone means it is waiting.
    pub async fn resume(ctx: WorkerContext) -> Result<Self, Error> {
        let state = if ctx.storage.is_activated(&ctx.config.version).await? {
            WorkerState::Activated
        } else if ctx.storage.list_partitions().await?.iter().any(|p| p == &ctx.config.static_cache) {
            WorkerState::Installed
        } else {
            WorkerState::Parsed
        };
        tracing::debug!(?state, version = %ctx.config.version, "resumed worker");
        Ok(Self { ctx, state: RwLock::new(state) })
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.ctx.config
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Install, then activate straight away when skip-waiting is on.
    pub async fn start(&self) -> Result<WorkerState, Error> {
        self.install().await?;
        if self.ctx.config.skip_waiting {
            self.activate().await?;
        }
        Ok(self.state().await)
    }

    /// Route one event to its handler.
    pub async fn dispatch(&self, event: Event) -> Result<EventOutcome, Error> {
        tracing::debug!(event = event.name(), "dispatching");
        match event {
            Event::Install => self.install().await.map(EventOutcome::Installed),
            Event::Activate => self.activate().await.map(EventOutcome::Activated),
            Event::Fetch(request) => self.fetch(request).await.map(EventOutcome::Response),
            Event::Sync { tag } => sync::handle_sync(&self.ctx, &tag).await.map(EventOutcome::Synced),
            Event::Push { data } => push::handle_push(&self.ctx, data.as_ref()).await.map(EventOutcome::NotificationShown),
            Event::NotificationClick(notification) => push::handle_notification_click(&self.ctx, &notification)
                .await
                .map(|opened| EventOutcome::NotificationClicked { opened }),
            Event::Message(message) => self.on_message(message).await.map(EventOutcome::Reply),
        }
    }

    /// Handle an intercepted request. Nothing is intercepted before activation.
    pub async fn fetch(&self, request: Request) -> Result<Served, Error> {
        let controlled = self.state().await == WorkerState::Activated;
        strategy::respond(&self.ctx, request, controlled).await
    }

    /// Handle a posted message.
    pub async fn on_message(&self, message: Message) -> Result<MessageReply, Error> {
        match message {
            Message::SkipWaiting => {
                let activation =
                    if self.state().await == WorkerState::Installed { Some(self.activate().await?) } else { None };
                Ok(MessageReply::SkipWaiting { state: self.state().await, activation })
            }
            Message::GetCacheStatus => {
                message::cache_status(&self.ctx, self.state().await).await.map(MessageReply::CacheStatus)
            }
            Message::PrefetchUrls { urls } => message::prefetch(&self.ctx, urls).await.map(MessageReply::Prefetched),
            Message::ClearCaches => {
                message::clear_caches(&self.ctx).await.map(|deleted| MessageReply::CachesCleared { deleted })
            }
        }
    }

    async fn install(&self) -> Result<InstallReport, Error> {
        let report = lifecycle::install(&self.ctx).await?;
        let mut state = self.state.write().await;
        if *state == WorkerState::Parsed {
            *state = WorkerState::Installed;
        }
        Ok(report)
    }

    async fn activate(&self) -> Result<ActivateReport, Error> {
        if self.state().await == WorkerState::Parsed {
            return Err(Error::NotControlled("cannot activate before install".into()));
        }

        let report = lifecycle::activate(&self.ctx).await?;
        self.ctx.storage.record_activation(&self.ctx.config.version).await?;
        *self.state.write().await = WorkerState::Activated;
        tracing::info!(version = %self.ctx.config.version, "claimed clients");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::{MockNetwork, RecordingNotifier, shop_url, test_app_config, test_parts};

    #[tokio::test]
    async fn test_start_installs_and_activates() {
        let (ctx, net, _) = test_parts(test_app_config()).await;
        net.page("/", 200, "home");
        net.page("/offline.html", 200, "You are offline");
        let worker = Worker::new(ctx);
        assert_eq!(worker.state().await, WorkerState::Parsed);

        assert_eq!(worker.start().await.unwrap(), WorkerState::Activated);

        net.set_offline(true);
        let served = worker.fetch(Request::get(shop_url("/"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
        assert_eq!(served.response.text(), "home");
    }

    #[tokio::test]
    async fn test_waiting_worker_does_not_intercept() {
        let app = AppConfig { skip_waiting: false, ..test_app_config() };
        let (ctx, net, _) = test_parts(app).await;
        net.page("/cart", 200, "cart");
        let worker = Worker::new(ctx);

        assert_eq!(worker.start().await.unwrap(), WorkerState::Installed);
        let served = worker.fetch(Request::get(shop_url("/cart"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::PassThrough);

        let reply = worker.on_message(Message::SkipWaiting).await.unwrap();
        let MessageReply::SkipWaiting { state, activation } = reply else { panic!("unexpected reply") };
        assert_eq!(state, WorkerState::Activated);
        assert!(activation.is_some());

        let served = worker.fetch(Request::get(shop_url("/cart"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_skip_waiting_when_active_is_a_no_op() {
        let (ctx, _net, _) = test_parts(test_app_config()).await;
        let worker = Worker::new(ctx);
        worker.start().await.unwrap();

        let reply = worker.on_message(Message::SkipWaiting).await.unwrap();
        let MessageReply::SkipWaiting { state, activation } = reply else { panic!("unexpected reply") };
        assert_eq!(state, WorkerState::Activated);
        assert!(activation.is_none());
    }

    #[tokio::test]
    async fn test_activate_before_install_fails() {
        let (ctx, _net, _) = test_parts(test_app_config()).await;
        let worker = Worker::new(ctx);
        let result = worker.dispatch(Event::Activate).await;
        assert!(matches!(result, Err(Error::NotControlled(_))));
    }

    #[tokio::test]
    async fn test_version_bump_cleans_old_partitions() {
        let (ctx, _net, _) = test_parts(test_app_config()).await;
        let storage = Arc::clone(&ctx.storage);
        Worker::new(ctx).start().await.unwrap();

        let app = AppConfig { version: "v2".into(), ..test_app_config() };
        let config = WorkerConfig::from_app(&app).unwrap();
        let ctx = WorkerContext::new(
            config,
            Arc::clone(&storage),
            Arc::new(MockNetwork::new()),
            Arc::new(RecordingNotifier::default()),
        );
        Worker::new(ctx).start().await.unwrap();

        assert_eq!(storage.list_partitions().await.unwrap(), vec!["storefront-static-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_resume_detects_installed_version() {
        let (ctx, _net, _) = test_parts(test_app_config()).await;
        assert_eq!(Worker::resume(ctx.clone()).await.unwrap().state().await, WorkerState::Parsed);

        Worker::new(ctx.clone()).start().await.unwrap();
        assert_eq!(Worker::resume(ctx).await.unwrap().state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_resumed_waiting_worker_stays_waiting() {
        let app = AppConfig { skip_waiting: false, ..test_app_config() };
        let (ctx, net, _) = test_parts(app).await;
        net.page("/cart", 200, "cart");
        assert_eq!(Worker::new(ctx.clone()).start().await.unwrap(), WorkerState::Installed);

        let resumed = Worker::resume(ctx.clone()).await.unwrap();
        assert_eq!(resumed.state().await, WorkerState::Installed);
        let served = resumed.fetch(Request::get(shop_url("/cart"))).await.unwrap();
        assert_eq!(served.source, ResponseSource::PassThrough);

        resumed.on_message(Message::SkipWaiting).await.unwrap();
        assert_eq!(Worker::resume(ctx).await.unwrap().state().await, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_resume_after_version_bump_waits_for_activation() {
        let (ctx, _net, _) = test_parts(test_app_config()).await;
        let storage = Arc::clone(&ctx.storage);
        Worker::new(ctx).start().await.unwrap();

        let app = AppConfig { version: "v2".into(), skip_waiting: false, ..test_app_config() };
        let ctx = WorkerContext::new(
            WorkerConfig::from_app(&app).unwrap(),
            storage,
            Arc::new(MockNetwork::new()),
            Arc::new(RecordingNotifier::default()),
        );
        Worker::new(ctx.clone()).start().await.unwrap();

        assert_eq!(Worker::resume(ctx).await.unwrap().state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_dispatch_routes_events() {
        let (ctx, _net, notifier) = test_parts(test_app_config()).await;
        let worker = Worker::new(ctx);

        let outcome = worker.dispatch(Event::Sync { tag: "background-sync".into() }).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Synced(SyncOutcome::Ran)));

        let outcome = worker.dispatch(Event::Push { data: None }).await.unwrap();
        let EventOutcome::NotificationShown(notification) = outcome else { panic!("unexpected outcome") };
        assert_eq!(notifier.shown().len(), 1);

        let outcome = worker.dispatch(Event::NotificationClick(notification)).await.unwrap();
        assert!(matches!(outcome, EventOutcome::NotificationClicked { opened: None }));

        let outcome = worker.dispatch(Event::Message(Message::GetCacheStatus)).await.unwrap();
        assert!(matches!(outcome, EventOutcome::Reply(MessageReply::CacheStatus(_))));
    }

    #[test]
    fn test_event_names() {
        assert_eq!(Event::Install.name(), "install");
        assert_eq!(Event::Sync { tag: "t".into() }.name(), "sync");
        assert_eq!(Event::Push { data: None }.name(), "push");
    }
}
