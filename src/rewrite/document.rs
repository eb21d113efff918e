//! Markup rewriting passes.
//!
//! # Data Flow
//! ```text
//! Document:  html → attribute pass → sprite pass → append sprites before </body>
//! Fragment:  html → sprite pass → append sprites at the end → attribute pass
//! ```
//!
//! # Design Decisions
//! - Streaming rewriter (lol_html): untouched bytes are emitted verbatim,
//!   only matched attributes are re-serialized
//! - Sprite failures never abort a pass, they are reported and skipped

use std::cell::Cell;

use lol_html::html_content::ContentType;
use lol_html::{element, end, HtmlRewriter, Settings};
use thiserror::Error;

use crate::observability::metrics;
use crate::rewrite::rules::{UrlRewriter, META_IMAGE_KEYS, REWRITE_RULES};
use crate::rewrite::svg::{InlineError, SvgInliner, USE_ATTRIBUTES};

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewriting failed: {0}")]
    Html(#[from] lol_html::errors::RewritingError),

    #[error("rewritten markup is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// What kind of markup is being rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Markup {
    /// A full page with a `<body>`.
    Document,
    /// An HTML snippet, e.g. the `data` of an AJAX command.
    Fragment,
}

/// Rewrite asset URLs and inline theme sprites.
pub fn rewrite_markup(
    html: &str,
    markup: Markup,
    rewriter: &UrlRewriter,
    inliner: &mut SvgInliner<'_>,
) -> Result<String, RewriteError> {
    match markup {
        Markup::Document => {
            let html = rewrite_attributes(html, rewriter)?;
            inline_sprites(&html, markup, inliner)
        }
        Markup::Fragment => {
            let html = inline_sprites(html, markup, inliner)?;
            rewrite_attributes(&html, rewriter)
        }
    }
}

/// Apply the rewrite rules and image `meta` rewriting.
pub fn rewrite_attributes(html: &str, rewriter: &UrlRewriter) -> Result<String, RewriteError> {
    let mut handlers = Vec::with_capacity(REWRITE_RULES.len() + 1);

    for rule in REWRITE_RULES {
        handlers.push(element!(rule.selector, move |el| {
            if let Some(value) = el.get_attribute(rule.attribute) {
                if let Some(rewritten) = rewriter.rewrite(rule.tag, &value) {
                    el.set_attribute(rule.attribute, &rewritten)?;
                }
            }
            Ok(())
        }));
    }

    handlers.push(element!("meta[content]", move |el| {
        let key = el
            .get_attribute("property")
            .or_else(|| el.get_attribute("name"));
        if !key.is_some_and(|key| META_IMAGE_KEYS.contains(&key.as_str())) {
            return Ok(());
        }
        if let Some(content) = el.get_attribute("content") {
            if let Some(rewritten) = rewriter.rewrite_meta(&content) {
                el.set_attribute("content", &rewritten)?;
            }
        }
        Ok(())
    }));

    run(
        html,
        Settings {
            element_content_handlers: handlers,
            ..Settings::default()
        },
    )
}

/// Point theme sprite references at inlined copies.
pub fn inline_sprites(
    html: &str,
    markup: Markup,
    inliner: &mut SvgInliner<'_>,
) -> Result<String, RewriteError> {
    let rewritten = run(
        html,
        Settings {
            element_content_handlers: vec![element!("use", |el| {
                for attribute in USE_ATTRIBUTES {
                    let Some(value) = el.get_attribute(attribute) else {
                        continue;
                    };
                    match inliner.inline_reference(&value) {
                        Ok(Some(fragment)) => el.set_attribute(attribute, &fragment)?,
                        Ok(None) => {}
                        Err(e) => report_inline_failure(&e),
                    }
                }
                Ok(())
            })],
            ..Settings::default()
        },
    )?;

    let Some(sprites) = inliner.take_markup() else {
        return Ok(rewritten);
    };

    match markup {
        Markup::Fragment => Ok(rewritten + &sprites),
        Markup::Document => append_to_body(&rewritten, &sprites),
    }
}

/// Sprites go before `</body>`; markup without a `<body>` element gets them
/// at the end of the document, inside the body the browser implies.
fn append_to_body(html: &str, sprites: &str) -> Result<String, RewriteError> {
    let in_body = Cell::new(false);

    run(
        html,
        Settings {
            element_content_handlers: vec![element!("body", |el| {
                if !in_body.get() {
                    el.append(sprites, ContentType::Html);
                    in_body.set(true);
                }
                Ok(())
            })],
            document_content_handlers: vec![end!(|end| {
                if !in_body.get() {
                    end.append(sprites, ContentType::Html);
                }
                Ok(())
            })],
            ..Settings::default()
        },
    )
}

fn report_inline_failure(error: &InlineError) {
    tracing::error!(severity = "critical", kind = error.kind(), "{}", error);
    metrics::record_sprite_failure(error.kind());
}

fn run(html: &str, settings: Settings<'_, '_>) -> Result<String, RewriteError> {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(settings, |c: &[u8]| output.extend_from_slice(c));
    rewriter.write(html.as_bytes())?;
    rewriter.end()?;
    Ok(String::from_utf8(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeConfig;
    use crate::rewrite::test_support::MapSource;
    use std::path::PathBuf;

    const SPRITE: &str = concat!(
        r#"<svg xmlns="http://www.w3.org/2000/svg">"#,
        r#"<symbol id="helsinki"></symbol><symbol id="logo"></symbol></svg>"#,
    );

    fn theme() -> ThemeConfig {
        ThemeConfig {
            document_root: PathBuf::from("/srv/www"),
            ..ThemeConfig::default()
        }
    }

    fn source() -> MapSource {
        MapSource::new(&[("/srv/www/themes/hdbt/sprite.svg", SPRITE)])
    }

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new("www.hel.fi", "test-assets")
    }

    fn rewrite_document(html: &str, source: &MapSource) -> String {
        let theme = theme();
        let mut inliner = SvgInliner::new(&theme, source);
        rewrite_markup(html, Markup::Document, &rewriter(), &mut inliner).unwrap()
    }

    const PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<link rel="stylesheet" href="/core/themes/claro/css/base.css">
<script src="/core/misc/drupal.js"></script>
</head><body>
<svg class="icon"><title>Helsinki</title><use href="/themes/hdbt/sprite.svg#helsinki" /></svg>
<svg class="icon"><use xlink:href="/themes/hdbt/sprite.svg#logo" /></svg>
<img src="/themes/test.jpg">
<a href="/fi/prefix-fi/node/1">Link</a>
</body></html>"#;

    #[test]
    fn test_document_rewrite() {
        let source = source();
        let out = rewrite_document(PAGE, &source);

        assert!(out.contains(r#"href="//www.hel.fi/core/themes/claro/css/base.css""#));
        assert!(out.contains(r#"src="/test-assets/core/misc/drupal.js""#));
        assert!(out.contains(r#"src="//www.hel.fi/themes/test.jpg""#));
        assert!(out.contains(r#"href="/fi/prefix-fi/node/1""#));
        assert!(out.contains(r##"href="#helsinki""##));
        assert!(out.contains(r##"xlink:href="#logo""##));
        assert!(out.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn test_shared_sprite_is_inlined_once() {
        let source = source();
        let out = rewrite_document(PAGE, &source);

        assert_eq!(out.matches(r#"<span style="display: none;">"#).count(), 1);
        assert!(out.contains(&format!(r#"<span style="display: none;">{SPRITE}</span></body>"#)));
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let source = source();
        let once = rewrite_document(PAGE, &source);
        let twice = rewrite_document(&once, &source);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unreadable_sprite_is_skipped() {
        let source = MapSource::new(&[]);
        let html = concat!(
            r#"<body><svg><use href="/themes/missing.svg#a"/></svg>"#,
            r#"<img src="/sites/a.png"></body>"#,
        );
        let out = rewrite_document(html, &source);

        assert!(out.contains(r#"href="/themes/missing.svg#a""#));
        assert!(out.contains(r#"src="//www.hel.fi/sites/a.png""#));
        assert!(!out.contains("display: none"));
    }

    #[test]
    fn test_non_theme_sprite_is_untouched() {
        let source = source();
        let html = r#"<body><svg><use href="/sites/default/files/icons.svg#a"/></svg></body>"#;
        let out = rewrite_document(html, &source);
        assert_eq!(out, html);
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_fragment_appends_sprites_at_end() {
        let source = source();
        let theme = theme();
        let mut inliner = SvgInliner::new(&theme, &source);
        let html = concat!(
            r#"<div><svg><use href="/themes/hdbt/sprite.svg#logo"/></svg>"#,
            r#"<img src="/themes/a.png"></div>"#,
        );

        let out = rewrite_markup(html, Markup::Fragment, &rewriter(), &mut inliner).unwrap();
        assert!(out.contains(r##"<use href="#logo""##));
        assert!(out.contains(r#"<img src="//www.hel.fi/themes/a.png"></div><span"#));
        assert!(out.ends_with(&format!(r#"<span style="display: none;">{SPRITE}</span>"#)));
    }

    #[test]
    fn test_document_without_body_keeps_sprites() {
        let source = source();
        let html = concat!(
            "<!DOCTYPE html><html><head><title>t</title></head>",
            r#"<svg><use href="/themes/hdbt/sprite.svg#helsinki"/></svg></html>"#,
        );
        let out = rewrite_document(html, &source);

        assert!(out.contains(r##"<use href="#helsinki""##));
        assert!(out.ends_with(&format!(r#"</html><span style="display: none;">{SPRITE}</span>"#)));
        assert_eq!(out.matches(r#"<span style="display: none;">"#).count(), 1);
    }

    #[test]
    fn test_meta_images() {
        let og_url = "https://www.hel.fi/fi/liikenne/test-0";
        let image = "https://www.hel.fi/themes/hdbt/images/og-global.png";
        let html = format!(
            r#"<head>
<meta property="og:url" content="{og_url}">
<meta property="og:image" content="{image}">
<meta name="twitter:image" content="{image}">
</head>"#
        );
        let rewriter = UrlRewriter::new("localhost", "test-assets");
        let out = rewrite_attributes(&html, &rewriter).unwrap();

        let rewritten = "//localhost/themes/hdbt/images/og-global.png";
        assert!(out.contains(&format!(r#"<meta property="og:url" content="{og_url}">"#)));
        assert!(out.contains(&format!(r#"<meta property="og:image" content="{rewritten}">"#)));
        assert!(out.contains(&format!(r#"<meta name="twitter:image" content="{rewritten}">"#)));
    }
}
