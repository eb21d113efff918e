//! Process environment snapshot.
//!
//! Everything the proxy reads from environment variables is captured here
//! once at startup and passed down explicitly.

use crate::hostname::HostnameSources;

/// Variable that turns on the crawler-blocking response header.
pub const X_ROBOTS_TAG_FLAG: &str = "DRUPAL_X_ROBOTS_TAG_HEADER";

#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Candidates for the external hostname.
    pub hostname: HostnameSources,

    /// Whether responses get `X-Robots-Tag: noindex, nofollow`.
    pub robots_noindex: bool,
}

impl Environment {
    pub fn from_env() -> Self {
        Self {
            hostname: HostnameSources::from_env(),
            robots_noindex: std::env::var(X_ROBOTS_TAG_FLAG)
                .map(|v| !v.is_empty())
                .unwrap_or(false),
        }
    }

    /// Build a snapshot from explicit variables, for embedding and tests.
    pub fn from_vars<K, V>(vars: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let robots_noindex = vars
            .iter()
            .any(|(k, v)| k.as_ref() == X_ROBOTS_TAG_FLAG && !v.as_ref().is_empty());

        Self {
            hostname: HostnameSources::from_vars(
                vars.iter().map(|(k, v)| (k.as_ref(), v.as_ref().to_string())),
            ),
            robots_noindex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_robots_flag() {
        assert!(Environment::from_vars(&[(X_ROBOTS_TAG_FLAG, "1")]).robots_noindex);
        assert!(!Environment::from_vars(&[(X_ROBOTS_TAG_FLAG, "")]).robots_noindex);
        assert!(!Environment::from_vars::<&str, &str>(&[]).robots_noindex);
    }
}
