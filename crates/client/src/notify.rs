//! Notifier for hosts without a notification tray.

use async_trait::async_trait;
use url::Url;

use swcache_core::worker::Notification;
use swcache_core::{Error, Notifier};

/// Writes notifications and window requests to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(
            tag = %notification.tag,
            title = %notification.title,
            body = %notification.body,
            url = notification.data.url.as_deref().unwrap_or(""),
            "notification"
        );
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<(), Error> {
        tracing::debug!(tag, "notification closed");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(url = %url, "open window");
        Ok(())
    }
}
