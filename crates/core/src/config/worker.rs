//! Immutable worker configuration derived from [`AppConfig`].

use url::Url;

use super::{AppConfig, ConfigError};

/// Defaults applied to push messages that leave fields out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
}

/// Everything the worker needs, resolved once at startup.
///
/// Partition names are computed here from the version token and never
/// change for the lifetime of a worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    pub version: String,
    pub static_cache: String,
    pub dynamic_cache: String,
    pub shell_routes: Vec<String>,
    pub static_assets: Vec<String>,
    pub offline_page: String,
    pub product_prefix: String,
    pub api_prefix: String,
    pub cache_first_prefixes: Vec<String>,
    pub skip_waiting: bool,
    pub sync_tag: String,
    pub notification: NotificationDefaults,
}

impl WorkerConfig {
    /// Build the worker configuration from validated application settings.
    pub fn from_app(app: &AppConfig) -> Result<Self, ConfigError> {
        app.validate()?;

        let origin = Url::parse(&app.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;

        Ok(Self {
            origin,
            version: app.version.clone(),
            static_cache: format!("{}-static-{}", app.cache_prefix, app.version),
            dynamic_cache: format!("{}-dynamic-{}", app.cache_prefix, app.version),
            shell_routes: app.shell_routes.clone(),
            static_assets: app.static_assets.clone(),
            offline_page: app.offline_page.clone(),
            product_prefix: app.product_prefix.clone(),
            api_prefix: app.api_prefix.clone(),
            cache_first_prefixes: app.cache_first_prefixes.clone(),
            skip_waiting: app.skip_waiting,
            sync_tag: app.sync_tag.clone(),
            notification: NotificationDefaults {
                title: app.notification_title.clone(),
                body: app.notification_body.clone(),
                icon: app.notification_icon.clone(),
                badge: app.notification_badge.clone(),
            },
        })
    }

    /// Paths precached into the static partition at install, shell routes
    /// first, duplicates removed.
    pub fn precache_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::with_capacity(self.shell_routes.len() + self.static_assets.len());
        for path in self.shell_routes.iter().chain(self.static_assets.iter()) {
            if !paths.contains(&path.as_str()) {
                paths.push(path);
            }
        }
        paths
    }

    /// Whether `path` is on the static allow-list.
    pub fn is_precached(&self, path: &str) -> bool {
        self.shell_routes.iter().any(|r| r == path) || self.static_assets.iter().any(|a| a == path)
    }

    /// Whether a partition belongs to the current version.
    pub fn is_current_partition(&self, name: &str) -> bool {
        name == self.static_cache || name == self.dynamic_cache
    }

    /// Resolve a path against the origin.
    pub fn url_for(&self, path: &str) -> Result<Url, url::ParseError> {
        self.origin.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names_follow_version() {
        let config = WorkerConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.static_cache, "storefront-static-v1");
        assert_eq!(config.dynamic_cache, "storefront-dynamic-v1");

        let bumped =
            WorkerConfig::from_app(&AppConfig { version: "v2".into(), ..Default::default() }).unwrap();
        assert_eq!(bumped.static_cache, "storefront-static-v2");
        assert!(!bumped.is_current_partition(&config.static_cache));
        assert!(bumped.is_current_partition("storefront-dynamic-v2"));
    }

    #[test]
    fn test_precache_paths_dedup() {
        let app = AppConfig {
            shell_routes: vec!["/".into(), "/offline.html".into()],
            static_assets: vec!["/offline.html".into(), "/manifest.json".into()],
            ..Default::default()
        };
        let config = WorkerConfig::from_app(&app).unwrap();
        assert_eq!(config.precache_paths(), vec!["/", "/offline.html", "/manifest.json"]);
        assert!(config.is_precached("/manifest.json"));
        assert!(!config.is_precached("/product/1"));
    }

    #[test]
    fn test_from_app_rejects_invalid() {
        let app = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert!(WorkerConfig::from_app(&app).is_err());
    }

    #[test]
    fn test_url_for() {
        let app = AppConfig { origin: "https://shop.test".into(), ..Default::default() };
        let config = WorkerConfig::from_app(&app).unwrap();
        assert_eq!(config.url_for("/cart").unwrap().as_str(), "https://shop.test/cart");
    }
}
