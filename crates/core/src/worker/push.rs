//! Push messages and notification clicks.

use bytes::Bytes;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::WorkerContext;
use super::url::resolve;
use crate::Error;
use crate::config::WorkerConfig;

/// Data attached to a notification and handed back on click.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotificationData {
    /// Page to open when the notification is clicked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// JSON body of a push message. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub tag: Option<String>,
    pub data: NotificationData,
}

/// A notification as handed to the tray.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Notification {
    pub tag: String,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(default)]
    pub data: NotificationData,
}

/// Decode a push body, falling back to an empty payload.
pub fn parse_payload(data: Option<&[u8]>) -> PushPayload {
    let Some(bytes) = data.filter(|b| !b.is_empty()) else {
        return PushPayload::default();
    };

    match serde_json::from_slice(bytes) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("ignoring malformed push payload: {e}");
            PushPayload::default()
        }
    }
}

/// Fill the payload's gaps from the configured defaults.
pub fn build_notification(config: &WorkerConfig, payload: PushPayload) -> Notification {
    let defaults = &config.notification;
    Notification {
        tag: payload.tag.unwrap_or_else(|| format!("push-{}", Utc::now().timestamp_millis())),
        title: payload.title.unwrap_or_else(|| defaults.title.clone()),
        body: payload.body.unwrap_or_else(|| defaults.body.clone()),
        icon: payload.icon.unwrap_or_else(|| defaults.icon.clone()),
        badge: defaults.badge.clone(),
        data: payload.data,
    }
}

/// Show a notification for an incoming push message.
pub async fn handle_push(ctx: &WorkerContext, data: Option<&Bytes>) -> Result<Notification, Error> {
    let payload = parse_payload(data.map(|b| b.as_ref()));
    let notification = build_notification(&ctx.config, payload);

    ctx.notifier.show(&notification).await?;
    tracing::info!(tag = %notification.tag, title = %notification.title, "notification shown");
    Ok(notification)
}

/// Close the clicked notification and open its target page, if it has one.
pub async fn handle_notification_click(ctx: &WorkerContext, notification: &Notification) -> Result<Option<Url>, Error> {
    ctx.notifier.close(&notification.tag).await?;

    let Some(target) = notification.data.url.as_deref() else {
        tracing::debug!(tag = %notification.tag, "notification has no target");
        return Ok(None);
    };

    let url = match resolve(&ctx.config.origin, target) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(tag = %notification.tag, target, "not opening notification target: {e}");
            return Ok(None);
        }
    };

    ctx.notifier.open_window(&url).await?;
    tracing::info!(tag = %notification.tag, url = %url, "opened window");
    Ok(Some(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{shop_url, test_app_config, test_parts};

    #[test]
    fn test_parse_payload_full() {
        let raw = br#"{"title":"Sale","body":"50% off","tag":"sale","data":{"url":"/product/7"}}"#;
        let payload = parse_payload(Some(raw));
        assert_eq!(payload.title.as_deref(), Some("Sale"));
        assert_eq!(payload.tag.as_deref(), Some("sale"));
        assert_eq!(payload.data.url.as_deref(), Some("/product/7"));
        assert!(payload.icon.is_none());
    }

    #[test]
    fn test_parse_payload_missing_or_malformed() {
        assert_eq!(parse_payload(None), PushPayload::default());
        assert_eq!(parse_payload(Some(b"")), PushPayload::default());
        assert_eq!(parse_payload(Some(b"not json")), PushPayload::default());
    }

    #[test]
    fn test_build_notification_defaults() {
        let config = WorkerConfig::from_app(&test_app_config()).unwrap();
        let notification = build_notification(&config, PushPayload::default());

        assert_eq!(notification.title, "New notification");
        assert_eq!(notification.icon, "/icons/icon-192x192.png");
        assert_eq!(notification.badge, "/icons/icon-72x72.png");
        assert!(notification.tag.starts_with("push-"));
        assert!(notification.data.url.is_none());
    }

    #[tokio::test]
    async fn test_handle_push_shows_notification() {
        let (ctx, _net, notifier) = test_parts(test_app_config()).await;
        let data = Bytes::from_static(br#"{"title":"Order shipped","tag":"order-12"}"#);

        let shown = handle_push(&ctx, Some(&data)).await.unwrap();
        assert_eq!(shown.title, "Order shipped");
        assert_eq!(notifier.shown(), vec![shown]);
    }

    #[tokio::test]
    async fn test_click_opens_relative_target() {
        let (ctx, _net, notifier) = test_parts(test_app_config()).await;
        let mut notification = build_notification(&ctx.config, PushPayload::default());
        notification.data.url = Some("/product/7".into());

        let opened = handle_notification_click(&ctx, &notification).await.unwrap();
        assert_eq!(opened, Some(shop_url("/product/7")));
        assert_eq!(notifier.closed(), vec![notification.tag.clone()]);
        assert_eq!(notifier.opened(), vec![shop_url("/product/7")]);
    }

    #[tokio::test]
    async fn test_click_without_target_only_closes() {
        let (ctx, _net, notifier) = test_parts(test_app_config()).await;
        let notification = build_notification(&ctx.config, PushPayload::default());

        let opened = handle_notification_click(&ctx, &notification).await.unwrap();
        assert!(opened.is_none());
        assert_eq!(notifier.closed().len(), 1);
        assert!(notifier.opened().is_empty());
    }

    #[tokio::test]
    async fn test_click_with_bad_target_does_nothing() {
        let (ctx, _net, notifier) = test_parts(test_app_config()).await;
        let mut notification = build_notification(&ctx.config, PushPayload::default());
        notification.data.url = Some("javascript:alert(1)".into());

        let opened = handle_notification_click(&ctx, &notification).await.unwrap();
        assert!(opened.is_none());
        assert!(notifier.opened().is_empty());
    }
}
