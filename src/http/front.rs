//! Empty front page.
//!
//! The public site owns the real front page; each proxied origin only needs
//! an empty, cacheable document at `/` carrying the configured title.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::config::ProxySettings;
use crate::http::server::AppState;
use crate::proxy::prefix::{SitePrefix, CACHE_CONTEXT};

/// Title used when none is configured.
pub const DEFAULT_TITLE: &str = "Front";
/// Cache tag invalidated whenever the proxy settings change.
pub const SETTINGS_CACHE_TAG: &str = "config:proxy.settings";

pub const CACHE_TAGS: &str = "cache-tags";
pub const X_CACHE_CONTEXTS: &str = "x-cache-contexts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontPage {
    pub title: String,
    pub langcode: String,
    pub cache_context: String,
}

impl FrontPage {
    pub fn new(settings: &ProxySettings, langcode: &str) -> Self {
        let title = settings
            .front_page_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();

        let cache_context = SitePrefix::new(settings)
            .cache_context(langcode)
            .unwrap_or_else(|| CACHE_CONTEXT.to_string());

        Self {
            title,
            langcode: langcode.to_string(),
            cache_context,
        }
    }

    pub fn render(&self) -> String {
        format!(
            concat!(
                "<!DOCTYPE html>\n<html lang=\"{lang}\">",
                "<head><meta charset=\"utf-8\"><title>{title}</title></head>",
                "<body></body></html>\n",
            ),
            lang = html_escape::encode_double_quoted_attribute(&self.langcode),
            title = html_escape::encode_text(&self.title),
        )
    }
}

impl IntoResponse for FrontPage {
    fn into_response(self) -> Response {
        let mut response = self.render().into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        headers.insert(CACHE_TAGS, HeaderValue::from_static(SETTINGS_CACHE_TAG));
        if let Ok(value) = HeaderValue::from_str(&self.cache_context) {
            headers.insert(X_CACHE_CONTEXTS, value);
        }
        response
    }
}

/// `GET /`
pub async fn front_page(State(state): State<AppState>) -> FrontPage {
    let settings = state.rewrite.settings.load();
    FrontPage::new(&settings, &state.front_page.langcode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_fallback() {
        let settings = ProxySettings::default();
        assert_eq!(FrontPage::new(&settings, "fi").title, "Front");

        let settings = ProxySettings {
            front_page_title: Some("  ".into()),
            ..ProxySettings::default()
        };
        assert_eq!(FrontPage::new(&settings, "fi").title, "Front");
    }

    #[test]
    fn test_title_is_escaped() {
        let settings = ProxySettings {
            front_page_title: Some("Kaupunki & <ympäristö>".into()),
            ..ProxySettings::default()
        };
        let html = FrontPage::new(&settings, "fi").render();
        assert!(html.contains("<title>Kaupunki &amp; &lt;ympäristö&gt;</title>"));
        assert!(html.contains("<body></body>"));
    }

    #[test]
    fn test_cache_headers() {
        let mut settings = ProxySettings::default();
        settings.prefixes.insert("fi".into(), "prefix-fi".into());

        let response = FrontPage::new(&settings, "fi").into_response();
        assert_eq!(response.headers()[CACHE_TAGS], "config:proxy.settings");
        assert_eq!(response.headers()[X_CACHE_CONTEXTS], "site_prefix:prefix-fi");

        let response = FrontPage::new(&settings, "sv").into_response();
        assert_eq!(response.headers()[X_CACHE_CONTEXTS], "site_prefix");
    }
}
