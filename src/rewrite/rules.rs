//! Attribute rewrite rules.
//!
//! # Responsibilities
//! - Fixed, ordered table of the tag/attribute pairs that are rewritten
//! - Map one attribute value to its public form, or report "no change"
//!
//! # Design Decisions
//! - Pure: no I/O, no logging, never fails; unmatched values pass through
//! - Rewritten values never match again, so a second pass is a no-op
//! - Shared verbatim by the HTML document and JSON fragment paths

use url::Url;

use crate::hostname::authority;

/// One tag/attribute pair subject to rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteRule {
    pub tag: &'static str,
    pub attribute: &'static str,
    /// Selector matching elements that carry the attribute.
    pub selector: &'static str,
}

/// Rules in evaluation order. Tags are disjoint, the order only keeps runs
/// deterministic.
pub const REWRITE_RULES: [RewriteRule; 5] = [
    RewriteRule { tag: "source", attribute: "srcset", selector: "source[srcset]" },
    RewriteRule { tag: "img", attribute: "src", selector: "img[src]" },
    RewriteRule { tag: "link", attribute: "href", selector: "link[href]" },
    RewriteRule { tag: "script", attribute: "src", selector: "script[src]" },
    RewriteRule { tag: "a", attribute: "href", selector: "a[href]" },
];

/// Path prefixes of the origin's document root that hold static files.
pub const ASSET_ROOTS: [&str; 6] = [
    "/core/",
    "/libraries/",
    "/modules/",
    "/profiles/",
    "/sites/",
    "/themes/",
];

/// `meta` keys (`property` or `name`) whose `content` is an image URL.
pub const META_IMAGE_KEYS: [&str; 3] = ["og:image", "og:image:url", "twitter:image"];

/// Rewrites origin-relative URLs into URLs valid behind the proxy.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    host: String,
    asset_prefix: Option<String>,
}

impl UrlRewriter {
    /// `hostname` may carry a scheme; only its authority is used.
    pub fn new(hostname: &str, asset_path: &str) -> Self {
        let asset_path = asset_path.trim_matches('/');
        Self {
            host: authority(hostname).to_string(),
            asset_prefix: (!asset_path.is_empty()).then(|| format!("/{asset_path}")),
        }
    }

    /// Rewrite the value of the rule attribute of `tag`.
    ///
    /// Returns `None` when the value stays as is.
    pub fn rewrite(&self, tag: &str, value: &str) -> Option<String> {
        match tag {
            "source" => self.rewrite_srcset(value),
            "img" | "link" => self.with_host(value),
            "script" => self.with_asset_path(value),
            "a" if is_asset_path(value) => self.with_host(value),
            _ => None,
        }
    }

    /// Rewrite the `content` of an image `meta` tag.
    ///
    /// Absolute URLs pointing into an asset root are made protocol-relative
    /// on the external host.
    pub fn rewrite_meta(&self, content: &str) -> Option<String> {
        if is_root_relative(content) {
            return is_asset_path(content)
                .then(|| self.with_host(content))
                .flatten();
        }

        let url = Url::parse(content).ok()?;
        if !matches!(url.scheme(), "http" | "https") || !is_asset_path(url.path()) {
            return None;
        }

        let mut out = format!("//{}{}", self.host, url.path());
        if let Some(query) = url.query() {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = url.fragment() {
            out.push('#');
            out.push_str(fragment);
        }
        Some(out)
    }

    fn with_host(&self, value: &str) -> Option<String> {
        is_root_relative(value).then(|| format!("//{}{}", self.host, value))
    }

    fn with_asset_path(&self, value: &str) -> Option<String> {
        let prefix = self.asset_prefix.as_deref()?;
        if !is_root_relative(value) {
            return None;
        }
        let already = value
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if already {
            return None;
        }
        Some(format!("{prefix}{value}"))
    }

    /// Rewrite candidate URLs in place; every other byte is kept.
    fn rewrite_srcset(&self, value: &str) -> Option<String> {
        let mut out = String::with_capacity(value.len() + 32);
        let mut copied = 0;

        for (start, end) in srcset_urls(value) {
            if let Some(rewritten) = self.with_host(&value[start..end]) {
                out.push_str(&value[copied..start]);
                out.push_str(&rewritten);
                copied = end;
            }
        }

        if copied == 0 {
            return None;
        }
        out.push_str(&value[copied..]);
        Some(out)
    }
}

/// Byte ranges of the candidate URLs of a `srcset` value.
///
/// Follows the HTML candidate grammar: a URL runs up to whitespace, trailing
/// commas end the candidate, otherwise descriptors run up to the next comma
/// outside parentheses. A comma inside a URL (`data:` URIs) is part of it.
fn srcset_urls(value: &str) -> Vec<(usize, usize)> {
    let bytes = value.as_bytes();
    let mut urls = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b',') {
            pos += 1;
        }
        if pos == bytes.len() {
            break;
        }

        let start = pos;
        while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        let mut end = pos;
        while end > start && bytes[end - 1] == b',' {
            end -= 1;
        }
        if end > start {
            urls.push((start, end));
        }
        if end < pos {
            continue;
        }

        let mut depth = 0usize;
        while pos < bytes.len() {
            match bytes[pos] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => break,
                _ => {}
            }
            pos += 1;
        }
    }

    urls
}

/// `/path` but not `//host/path`.
fn is_root_relative(value: &str) -> bool {
    value.starts_with('/') && !value.starts_with("//") && !value.starts_with("/\\")
}

fn is_asset_path(value: &str) -> bool {
    ASSET_ROOTS.iter().any(|root| value.starts_with(root))
}
