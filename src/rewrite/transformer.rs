//! Response body transformation.
//!
//! # Responsibilities
//! - Dispatch on content type: HTML document, JSON with HTML fragments, opaque
//! - Run attribute rewriting and sprite inlining with one cache per response
//! - Report why a body was left alone
//!
//! # Design Decisions
//! - Synchronous and side-effect free apart from sprite reads and logging;
//!   the caller buffers the body and applies the outcome
//! - JSON is re-encoded only when a fragment actually changed, so untouched
//!   payloads keep their exact bytes
//! - Any failure degrades to the original body

use axum::http::{HeaderMap, HeaderValue};
use serde_json::Value;

use crate::config::{ProxySettings, ThemeConfig};
use crate::observability::metrics;
use crate::rewrite::document::{rewrite_markup, Markup};
use crate::rewrite::rules::UrlRewriter;
use crate::rewrite::svg::{SpriteSource, SvgInliner};

/// Crawler-control response header.
pub const X_ROBOTS_TAG: &str = "x-robots-tag";
/// Value of `X-Robots-Tag` when crawling is disallowed.
pub const ROBOTS_NOINDEX: &str = "noindex, nofollow";

/// How a response body is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Json,
    Opaque,
}

impl ContentKind {
    /// Classify a `Content-Type` header value.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(content_type) = content_type else {
            return ContentKind::Opaque;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/html" | "application/xhtml+xml" => ContentKind::Html,
            "application/json" => ContentKind::Json,
            other if other.starts_with("application/") && other.ends_with("+json") => {
                ContentKind::Json
            }
            _ => ContentKind::Opaque,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Html => "html",
            ContentKind::Json => "json",
            ContentKind::Opaque => "opaque",
        }
    }
}

/// Why a body was left as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
    NotProxied,
    Opaque,
    Encoded,
    BodyError,
    TooLarge,
    NotUtf8,
    MalformedJson,
    NoChanges,
    RewriteFailed,
}

impl Passthrough {
    pub fn as_str(&self) -> &'static str {
        match self {
            Passthrough::NotProxied => "not_proxied",
            Passthrough::Opaque => "opaque",
            Passthrough::Encoded => "encoded",
            Passthrough::BodyError => "body_error",
            Passthrough::TooLarge => "too_large",
            Passthrough::NotUtf8 => "not_utf8",
            Passthrough::MalformedJson => "malformed_json",
            Passthrough::NoChanges => "no_changes",
            Passthrough::RewriteFailed => "rewrite_failed",
        }
    }
}

/// Result of transforming one body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rewritten(String),
    Unchanged(Passthrough),
}

/// Add `X-Robots-Tag` when crawling is disallowed for this environment.
pub fn apply_robots_header(headers: &mut HeaderMap, robots_noindex: bool) {
    if robots_noindex {
        headers.insert(X_ROBOTS_TAG, HeaderValue::from_static(ROBOTS_NOINDEX));
    }
}

/// Rewrites the body of one response.
pub struct ResponseTransformer<'a> {
    rewriter: UrlRewriter,
    theme: &'a ThemeConfig,
    sprites: &'a dyn SpriteSource,
}

impl<'a> ResponseTransformer<'a> {
    pub fn new(
        hostname: &str,
        settings: &ProxySettings,
        theme: &'a ThemeConfig,
        sprites: &'a dyn SpriteSource,
    ) -> Self {
        Self {
            rewriter: UrlRewriter::new(hostname, &settings.asset_path),
            theme,
            sprites,
        }
    }

    pub fn transform(&self, kind: ContentKind, body: &[u8]) -> Outcome {
        match kind {
            ContentKind::Opaque => Outcome::Unchanged(Passthrough::Opaque),
            ContentKind::Json => self.transform_json(body),
            ContentKind::Html => match std::str::from_utf8(body) {
                Ok(html) => self.transform_html(html),
                Err(_) => Outcome::Unchanged(Passthrough::NotUtf8),
            },
        }
    }

    /// Rewrite a full HTML page: attributes first, then sprites.
    pub fn transform_html(&self, html: &str) -> Outcome {
        let mut inliner = SvgInliner::new(self.theme, self.sprites);

        let result = rewrite_markup(html, Markup::Document, &self.rewriter, &mut inliner);
        metrics::record_sprites_inlined(inliner.cache().inlined_count());

        match result {
            Ok(out) if out == html => Outcome::Unchanged(Passthrough::NoChanges),
            Ok(out) => Outcome::Rewritten(out),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to rewrite HTML response, serving it as is");
                Outcome::Unchanged(Passthrough::RewriteFailed)
            }
        }
    }

    /// Rewrite the `data` HTML fragments of a JSON object or array.
    pub fn transform_json(&self, body: &[u8]) -> Outcome {
        let mut value: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Response body is not valid JSON, serving it as is");
                return Outcome::Unchanged(Passthrough::MalformedJson);
            }
        };

        let entries: Box<dyn Iterator<Item = &mut Value>> = match &mut value {
            Value::Object(map) => Box::new(map.values_mut()),
            Value::Array(items) => Box::new(items.iter_mut()),
            _ => return Outcome::Unchanged(Passthrough::NoChanges),
        };

        let mut inliner = SvgInliner::new(self.theme, self.sprites);
        let mut changed = false;

        for entry in entries {
            let Some(Value::String(data)) = entry.get_mut("data") else {
                continue;
            };
            match rewrite_markup(data, Markup::Fragment, &self.rewriter, &mut inliner) {
                Ok(out) if out != *data => {
                    *data = out;
                    changed = true;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to rewrite JSON fragment, keeping it as is");
                }
            }
        }
        metrics::record_sprites_inlined(inliner.cache().inlined_count());

        if !changed {
            return Outcome::Unchanged(Passthrough::NoChanges);
        }

        match serde_json::to_string(&value) {
            Ok(json) => Outcome::Rewritten(json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode rewritten JSON, serving it as is");
                Outcome::Unchanged(Passthrough::RewriteFailed)
            }
        }
    }
}
