//! Site prefixes.
//!
//! Each origin owns one public path prefix per language, e.g. Finnish pages
//! of this origin live under `/fi/prefix-fi/...`. The origin itself routes
//! without the site prefix.

use crate::config::ProxySettings;

/// Cache context name; responses vary per active site prefix.
pub const CACHE_CONTEXT: &str = "site_prefix";

#[derive(Debug, Clone, Copy)]
pub struct SitePrefix<'a> {
    settings: &'a ProxySettings,
}

impl<'a> SitePrefix<'a> {
    pub fn new(settings: &'a ProxySettings) -> Self {
        Self { settings }
    }

    /// Public prefix of the given language.
    pub fn prefix_for(&self, langcode: &str) -> Option<&'a str> {
        self.settings.prefixes.get(langcode).map(String::as_str)
    }

    /// Cache context key for the given language, e.g. `site_prefix:prefix-fi`.
    pub fn cache_context(&self, langcode: &str) -> Option<String> {
        self.prefix_for(langcode)
            .map(|prefix| format!("{CACHE_CONTEXT}:{prefix}"))
    }

    /// Language owning the site prefix of a public path.
    ///
    /// The prefix is accepted as the first segment or right after a language
    /// segment. Returns `None` when the path carries no known prefix.
    pub fn language_of(&self, path: &str) -> Option<&'a str> {
        let mut segments = path.trim_start_matches('/').splitn(3, '/');
        let first = segments.next().unwrap_or_default();
        self.owner_of(first)
            .or_else(|| segments.next().and_then(|second| self.owner_of(second)))
    }

    fn owner_of(&self, segment: &str) -> Option<&'a str> {
        if segment.is_empty() {
            return None;
        }
        self.settings
            .prefixes
            .iter()
            .find(|(_, prefix)| prefix.as_str() == segment)
            .map(|(langcode, _)| langcode.as_str())
    }
}
