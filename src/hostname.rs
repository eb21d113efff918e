//! Canonical external hostname resolution.
//!
//! # Responsibilities
//! - Snapshot the hostname-bearing environment variables once
//! - Pick the winning variable by priority (first non-empty wins)
//! - Pick the authoritative host inside a comma-separated value (last wins)
//! - Produce a cache-safe token from the resolved hostname
//!
//! # Design Decisions
//! - The environment is read into `HostnameSources` up front; resolution
//!   itself never touches the process environment
//! - An unresolvable hostname is a deployment error and fails hard

use thiserror::Error;

/// Hostname-bearing environment variables, highest priority first.
pub const HOSTNAME_VARIABLES: [&str; 4] = [
    "HOSTNAME",
    "DRUPAL_REVERSE_PROXY_ADDRESS",
    "DRUPAL_ROUTES",
    "SIMPLETEST_BASE_URL",
];

/// Errors raised while resolving the external hostname.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostnameError {
    /// None of the recognized variables carries a value.
    #[error("Proxy: invalid hostname, none of {} is set", HOSTNAME_VARIABLES.join(", "))]
    NotConfigured,

    /// The winning variable ends with an empty host entry.
    #[error("Proxy: invalid hostname, last entry of {0} is empty")]
    EmptyCandidate(&'static str),
}

/// A snapshot of the hostname candidates, in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostnameSources {
    values: Vec<(&'static str, String)>,
}

impl HostnameSources {
    /// Read the recognized variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a snapshot from explicit `(name, value)` pairs.
    ///
    /// Names that are not recognized hostname variables are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let vars: Vec<(String, String)> = vars
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.into()))
            .collect();

        Self::from_lookup(|name| {
            vars.iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
        })
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let values = HOSTNAME_VARIABLES
            .iter()
            .filter_map(|name| lookup(name).map(|value| (*name, value)))
            .collect();
        Self { values }
    }

    /// The first variable with a non-empty value, if any.
    fn winner(&self) -> Option<(&'static str, &str)> {
        HOSTNAME_VARIABLES.iter().find_map(|name| {
            self.values
                .iter()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(key, value)| (*key, value.as_str()))
        })
    }
}

/// Resolves the hostname the outside world sees this site under.
#[derive(Debug, Clone)]
pub struct HostnameResolver {
    sources: HostnameSources,
}

impl HostnameResolver {
    pub fn new(sources: HostnameSources) -> Self {
        Self { sources }
    }

    /// Resolve the canonical hostname.
    ///
    /// The value is returned as configured, scheme included when present.
    pub fn resolve(&self) -> Result<String, HostnameError> {
        let (name, value) = self.sources.winner().ok_or(HostnameError::NotConfigured)?;
        let host = parse_hostname(value);
        if host.is_empty() {
            return Err(HostnameError::EmptyCandidate(name));
        }
        Ok(host.to_string())
    }

    /// Resolve the hostname and reduce it to a cache-safe token.
    pub fn clean_hostname(&self) -> Result<String, HostnameError> {
        self.resolve().map(|host| clean_hostname(&host))
    }
}

/// Pick the authoritative entry of a comma-separated host list.
///
/// Deployment tooling appends environment-specific overrides, so the last
/// entry wins. The entry is returned exactly as written.
pub fn parse_hostname(value: &str) -> &str {
    value.rsplit(',').next().unwrap_or(value)
}

/// Strip the scheme and replace everything outside `[a-z0-9_]` with `_`.
pub fn clean_hostname(host: &str) -> String {
    strip_scheme(host)
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// The host part usable after `//` in a protocol-relative URL.
pub fn authority(host: &str) -> &str {
    strip_scheme(host).trim_end_matches('/')
}

fn strip_scheme(host: &str) -> &str {
    host.strip_prefix("https://")
        .or_else(|| host.strip_prefix("http://"))
        .unwrap_or(host)
}
