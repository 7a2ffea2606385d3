//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;
mod worker;

pub use validation::ConfigError;
pub use worker::{NotificationDefaults, WorkerConfig};

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite partition store.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per network response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network timeout in milliseconds, enforced by the HTTP stack.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects the HTTP stack follows.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Origin the worker is registered for. Requests to any other origin pass through.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Version token. Partition names are derived from it, so bumping it
    /// retires every partition of the previous deploy on the next activation.
    ///
    /// Set via SWCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix for partition names.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Shell pages precached at install and served cache-first.
    #[serde(default = "default_shell_routes")]
    pub shell_routes: Vec<String>,

    /// Static files precached at install and served cache-first.
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Page served to failed navigations with nothing cached.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Product detail prefix, served network-first.
    #[serde(default = "default_product_prefix")]
    pub product_prefix: String,

    /// API prefix, served network-first.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Extra prefixes served cache-first from the dynamic partition.
    #[serde(default)]
    pub cache_first_prefixes: Vec<String>,

    /// Activate right after install instead of waiting for a SKIP_WAITING message.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Background sync tag that triggers the sync hook.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Title used for push messages that carry none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Body used for push messages that carry none.
    #[serde(default)]
    pub notification_body: String,

    /// Icon used for push messages that carry none.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Badge attached to every notification.
    #[serde(default = "default_notification_badge")]
    pub notification_badge: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_cache_prefix() -> String {
    "storefront".into()
}

fn default_shell_routes() -> Vec<String> {
    ["/", "/products", "/cart", "/wishlist", "/login", "/register", "/offline.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_static_assets() -> Vec<String> {
    ["/manifest.json", "/favicon.ico", "/icons/icon-192x192.png", "/icons/icon-512x512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_product_prefix() -> String {
    "/product/".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_true() -> bool {
    true
}

fn default_sync_tag() -> String {
    "background-sync".into()
}

fn default_notification_title() -> String {
    "New notification".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            origin: default_origin(),
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            shell_routes: default_shell_routes(),
            static_assets: default_static_assets(),
            offline_page: default_offline_page(),
            product_prefix: default_product_prefix(),
            api_prefix: default_api_prefix(),
            cache_first_prefixes: Vec::new(),
            skip_waiting: true,
            sync_tag: default_sync_tag(),
            notification_title: default_notification_title(),
            notification_body: String::new(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_badge(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config_file = std::env::var("SWCACHE_CONFIG_FILE").ok();
        Self::load_from(config_file.as_deref())
    }

    /// Same as [`AppConfig::load`], with an explicit TOML file taking the
    /// place of `SWCACHE_CONFIG_FILE`.
    pub fn load_from(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_path) = config_file {
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./swcache.sqlite"));
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.version, "v1");
        assert_eq!(config.offline_page, "/offline.html");
        assert!(config.shell_routes.contains(&"/cart".to_string()));
        assert!(config.skip_waiting);
        assert!(config.cache_first_prefixes.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "swcache.toml",
                r#"
                version = "v7"
                origin = "https://shop.test"
                shell_routes = ["/", "/cart"]
                "#,
            )?;
            jail.set_env("SWCACHE_VERSION", "v8");

            let config = AppConfig::load_from(Some("swcache.toml")).expect("config should load");
            assert_eq!(config.version, "v8");
            assert_eq!(config.origin, "https://shop.test");
            assert_eq!(config.shell_routes, vec!["/".to_string(), "/cart".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("SWCACHE_TIMEOUT_MS", "5");
            let result = AppConfig::load_from(None);
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }
}
