//! Notification registry for the MCP host.
//!
//! Shown notifications are kept by tag so a later `notification_click` call
//! can refer to one by tag alone.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use swcache_core::worker::Notification;
use swcache_core::{Error, Notifier};

#[derive(Debug, Default)]
pub struct NotificationCenter {
    active: Mutex<HashMap<String, Notification>>,
    opened: Mutex<Vec<Url>>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, tag: &str) -> Option<Notification> {
        self.active.lock().await.get(tag).cloned()
    }

    /// Notifications currently displayed, ordered by tag.
    pub async fn active(&self) -> Vec<Notification> {
        let mut list: Vec<Notification> = self.active.lock().await.values().cloned().collect();
        list.sort_by(|a, b| a.tag.cmp(&b.tag));
        list
    }

    pub async fn opened(&self) -> Vec<Url> {
        self.opened.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for NotificationCenter {
    async fn show(&self, notification: &Notification) -> Result<(), Error> {
        tracing::info!(tag = %notification.tag, title = %notification.title, "notification");
        self.active.lock().await.insert(notification.tag.clone(), notification.clone());
        Ok(())
    }

    async fn close(&self, tag: &str) -> Result<(), Error> {
        self.active.lock().await.remove(tag);
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        tracing::info!(url = %url, "open window");
        self.opened.lock().await.push(url.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swcache_core::worker::NotificationData;

    fn notification(tag: &str) -> Notification {
        Notification {
            tag: tag.into(),
            title: "Sale".into(),
            body: String::new(),
            icon: "/icons/icon-192x192.png".into(),
            badge: "/icons/icon-72x72.png".into(),
            data: NotificationData::default(),
        }
    }

    #[tokio::test]
    async fn test_show_replaces_same_tag_and_close_removes() {
        let center = NotificationCenter::new();
        center.show(&notification("b")).await.unwrap();
        center.show(&notification("a")).await.unwrap();
        center.show(&notification("a")).await.unwrap();

        let tags: Vec<String> = center.active().await.into_iter().map(|n| n.tag).collect();
        assert_eq!(tags, vec!["a", "b"]);

        center.close("a").await.unwrap();
        assert!(center.get("a").await.is_none());
        assert!(center.get("b").await.is_some());
    }
}
