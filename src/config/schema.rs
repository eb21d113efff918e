//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the asset proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The origin application whose responses are rewritten.
    pub origin: OriginConfig,

    /// Rewrite settings, hot reloadable.
    pub proxy: ProxySettings,

    /// Where theme sprites live on disk.
    pub theme: ThemeConfig,

    /// Empty front page served by the proxy itself.
    pub front_page: FrontPageConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Response buffering limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Origin address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Settings consulted on every request by the rewrite middleware.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxySettings {
    /// Public path segment script assets are served under (e.g. "test-assets").
    pub asset_path: String,

    /// Language code to public site prefix (e.g. "fi" -> "prefix-fi").
    pub prefixes: BTreeMap<String, String>,

    /// Title of the empty front page.
    pub front_page_title: Option<String>,

    /// Manually configured identity provider return URL.
    pub tunnistamo_return_url: Option<String>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            asset_path: "assets".to_string(),
            prefixes: BTreeMap::new(),
            front_page_title: None,
            tunnistamo_return_url: None,
        }
    }
}

/// Theme sprite lookup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// Filesystem directory the origin serves its document root from.
    pub document_root: PathBuf,

    /// URL path prefixes of theme trees whose sprites get inlined.
    pub roots: Vec<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            document_root: PathBuf::from("/var/www/html/public"),
            roots: vec!["/core/themes".to_string(), "/themes".to_string()],
        }
    }
}

/// Front page configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FrontPageConfig {
    /// Serve the empty front page at `/` instead of forwarding it.
    pub enabled: bool,

    /// Language the front page is rendered in.
    pub langcode: String,
}

impl Default for FrontPageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            langcode: "fi".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Response buffering limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest response body buffered for rewriting, in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [proxy]
            asset_path = "test-assets"

            [proxy.prefixes]
            fi = "prefix-fi"
            sv = "prefix-sv"
            "#,
        )
        .unwrap();

        assert_eq!(config.proxy.asset_path, "test-assets");
        assert_eq!(config.proxy.prefixes["sv"], "prefix-sv");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.theme.roots, vec!["/core/themes", "/themes"]);
        assert!(config.proxy.front_page_title.is_none());
    }
}
