//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn require_absolute(field: &str, path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(invalid(field, format!("'{path}' must start with '/'")));
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent`, `version` or `cache_prefix` is empty
    /// - `origin` is not an http(s) URL
    /// - a route, asset, prefix or the offline page is not an absolute path
    ///
    /// Returns `ConfigError::Missing` if no shell route is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.version.trim().is_empty() {
            return Err(invalid("version", "must not be empty"));
        }
        if self.cache_prefix.trim().is_empty() || self.cache_prefix.chars().any(char::is_whitespace) {
            return Err(invalid("cache_prefix", "must be non-empty without whitespace"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") && origin.host_str().is_some() => {}
            Ok(origin) => return Err(invalid("origin", format!("unsupported origin: {origin}"))),
            Err(e) => return Err(invalid("origin", e.to_string())),
        }

        if self.shell_routes.is_empty() {
            return Err(ConfigError::Missing {
                field: "shell_routes".into(),
                hint: "list at least one page to precache, e.g. \"/\"".into(),
            });
        }
        for route in &self.shell_routes {
            require_absolute("shell_routes", route)?;
        }
        for asset in &self.static_assets {
            require_absolute("static_assets", asset)?;
        }
        for prefix in &self.cache_first_prefixes {
            require_absolute("cache_first_prefixes", prefix)?;
        }
        require_absolute("offline_page", &self.offline_page)?;
        require_absolute("product_prefix", &self.product_prefix)?;
        require_absolute("api_prefix", &self.api_prefix)?;

        if !self.shell_routes.contains(&self.offline_page) && !self.static_assets.contains(&self.offline_page) {
            tracing::warn!(
                offline_page = %self.offline_page,
                "offline page is not precached; failed navigations will only find it if it was fetched earlier"
            );
        }

        Ok(())
    }
}
