//! Identity provider (Tunnistamo) return URL.
//!
//! The origin cannot build its own login return URL because it does not
//! know the public hostname and site prefix.

use crate::config::ProxySettings;
use crate::proxy::prefix::SitePrefix;

/// Origin route handling the identity provider callback.
pub const TUNNISTAMO_CALLBACK_PATH: &str = "openid-connect/tunnistamo";

/// Build the return URL for the given language.
///
/// A configured `tunnistamo_return_url` always wins; a bare path is joined
/// onto the hostname. Otherwise the URL is derived from the site prefix.
/// Returns `None` when the language has no site prefix and nothing is
/// configured.
pub fn return_url(settings: &ProxySettings, hostname: &str, langcode: &str) -> Option<String> {
    let base = base_url(hostname);

    if let Some(configured) = settings
        .tunnistamo_return_url
        .as_deref()
        .filter(|url| !url.is_empty())
    {
        if configured.starts_with("http://") || configured.starts_with("https://") {
            return Some(configured.to_string());
        }
        return Some(format!("{base}/{}", configured.trim_start_matches('/')));
    }

    let prefix = SitePrefix::new(settings).prefix_for(langcode)?;
    Some(format!("{base}/{langcode}/{prefix}/{TUNNISTAMO_CALLBACK_PATH}"))
}

fn base_url(hostname: &str) -> String {
    let hostname = hostname.trim_end_matches('/');
    if hostname.starts_with("http://") || hostname.starts_with("https://") {
        hostname.to_string()
    } else {
        format!("https://{hostname}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProxySettings {
        let mut settings = ProxySettings::default();
        for lang in ["en", "fi", "sv"] {
            settings.prefixes.insert(lang.into(), format!("prefix-{lang}"));
        }
        settings
    }

    #[test]
    fn test_configured_url_is_preferred() {
        let mut s = settings();
        s.tunnistamo_return_url = Some("/fi/jotain/openid-connect/tunnistamo".into());
        assert_eq!(
            return_url(&s, "http://localhost", "fi").as_deref(),
            Some("http://localhost/fi/jotain/openid-connect/tunnistamo")
        );

        s.tunnistamo_return_url = Some("https://login.example.com/cb".into());
        assert_eq!(
            return_url(&s, "www.hel.fi", "fi").as_deref(),
            Some("https://login.example.com/cb")
        );
    }

    #[test]
    fn test_fallback_uses_site_prefix() {
        assert_eq!(
            return_url(&settings(), "http://localhost", "fi").as_deref(),
            Some("http://localhost/fi/prefix-fi/openid-connect/tunnistamo")
        );
        assert_eq!(
            return_url(&settings(), "www.hel.fi", "sv").as_deref(),
            Some("https://www.hel.fi/sv/prefix-sv/openid-connect/tunnistamo")
        );
        assert_eq!(return_url(&settings(), "www.hel.fi", "de"), None);
    }
}
