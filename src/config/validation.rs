//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Site prefixes: valid language codes, unique non-empty segments
//! - Asset path and theme roots are usable as URL path prefixes
//! - Origin and listener addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::{AppConfig, ProxySettings};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid language code '{0}' in proxy.prefixes")]
    InvalidLangcode(String),

    #[error("site prefix for '{0}' must be a single non-empty path segment")]
    InvalidPrefix(String),

    #[error("site prefix '{0}' is used by more than one language")]
    DuplicatePrefix(String),

    #[error("proxy.asset_path must be a non-empty path without whitespace")]
    InvalidAssetPath,

    #[error("theme root '{0}' must start with '/'")]
    InvalidThemeRoot(String),

    #[error("invalid listener address '{0}'")]
    InvalidBindAddress(String),

    #[error("invalid origin address '{0}'")]
    InvalidOriginAddress(String),

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,
}

/// Validate a full configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_settings(&config.proxy).err().unwrap_or_default();

    for root in &config.theme.roots {
        if !root.starts_with('/') {
            errors.push(ValidationError::InvalidThemeRoot(root.clone()));
        }
    }

    if SocketAddr::from_str(&config.listener.bind_address).is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if Authority::from_str(&config.origin.address).is_err() {
        errors.push(ValidationError::InvalidOriginAddress(
            config.origin.address.clone(),
        ));
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the hot-reloadable part of the configuration.
pub fn validate_settings(settings: &ProxySettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (langcode, prefix) in &settings.prefixes {
        if !is_valid_langcode(langcode) {
            errors.push(ValidationError::InvalidLangcode(langcode.clone()));
        }
        if prefix.is_empty() || prefix.contains('/') || prefix.contains(char::is_whitespace) {
            errors.push(ValidationError::InvalidPrefix(langcode.clone()));
        } else if !seen.insert(prefix.as_str()) {
            errors.push(ValidationError::DuplicatePrefix(prefix.clone()));
        }
    }

    let asset_path = settings.asset_path.trim_matches('/');
    if asset_path.is_empty() || asset_path.contains(char::is_whitespace) {
        errors.push(ValidationError::InvalidAssetPath);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Language codes look like `fi`, `sv`, `en` or `pt-br`.
fn is_valid_langcode(code: &str) -> bool {
    let mut parts = code.split('-');
    let primary = parts.next().unwrap_or_default();

    (2..=3).contains(&primary.len())
        && primary.chars().all(|c| c.is_ascii_lowercase())
        && parts.all(|p| {
            !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(prefixes: &[(&str, &str)]) -> ProxySettings {
        ProxySettings {
            asset_path: "test-assets".into(),
            prefixes: prefixes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..ProxySettings::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_valid_prefixes() {
        let s = settings(&[("fi", "prefix-fi"), ("sv", "prefix-sv"), ("pt-br", "prefix-pt")]);
        assert!(validate_settings(&s).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut s = settings(&[("FI", "prefix"), ("sv", "prefix"), ("en", "a/b")]);
        s.asset_path = "/".into();

        let errors = validate_settings(&s).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidLangcode("FI".into())));
        assert!(errors.contains(&ValidationError::DuplicatePrefix("prefix".into())));
        assert!(errors.contains(&ValidationError::InvalidPrefix("en".into())));
        assert!(errors.contains(&ValidationError::InvalidAssetPath));
    }

    #[test]
    fn test_addresses_and_roots() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "not an address".into();
        config.origin.address = "".into();
        config.theme.roots.push("themes".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
