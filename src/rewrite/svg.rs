//! SVG sprite inlining.
//!
//! Browsers refuse `<use>` references to sprite sheets on another origin, so
//! sprites under the theme trees are read from disk, appended to the page
//! inside a hidden container and referenced by fragment only:
//! `/themes/hdbt/sprite.svg#logo` becomes `#logo`.
//!
//! # Design Decisions
//! - One `SvgInliner` per response; its cache never outlives the response
//! - Each distinct sprite file is read at most once per response, failed
//!   reads included
//! - Failures are returned per reference; callers log them and move on

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use crate::config::ThemeConfig;

/// Attributes of `<use>` that may reference a sprite.
pub const USE_ATTRIBUTES: [&str; 2] = ["href", "xlink:href"];

/// Reads sprite files.
pub trait SpriteSource: Send + Sync {
    fn read_sprite(&self, path: &Path) -> io::Result<String>;
}

/// Reads sprites from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSpriteSource;

impl SpriteSource for FsSpriteSource {
    fn read_sprite(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Why a sprite reference could not be inlined.
#[derive(Debug, Error)]
pub enum InlineError {
    #[error("Found a SVG that cannot be inlined. Please fix it manually: {0}")]
    Malformed(String),

    #[error("Found a SVG that cannot be inlined. Please fix it manually: {value} ({source})")]
    Unreadable {
        value: String,
        #[source]
        source: io::Error,
    },

    #[error("Found a SVG that cannot be inlined. Please fix it manually: {0} (empty file)")]
    Empty(String),

    #[error(
        "Found a SVG that cannot be inlined. Please fix it manually: {0} (read failed earlier)"
    )]
    PreviouslyFailed(String),
}

impl InlineError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            InlineError::Malformed(_) => "malformed",
            InlineError::Unreadable { .. } => "unreadable",
            InlineError::Empty(_) => "empty",
            InlineError::PreviouslyFailed(_) => "previously_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpriteState {
    Inlined,
    Failed,
}

/// Sprite files already handled within one response.
#[derive(Debug, Default)]
pub struct SvgInlineCache {
    entries: HashMap<PathBuf, SpriteState>,
}

impl SvgInlineCache {
    pub fn inlined_count(&self) -> usize {
        self.entries
            .values()
            .filter(|state| **state == SpriteState::Inlined)
            .count()
    }
}

/// Inlines theme sprites for a single response.
pub struct SvgInliner<'a> {
    theme_roots: &'a [String],
    document_root: &'a Path,
    source: &'a dyn SpriteSource,
    cache: SvgInlineCache,
    pending: Vec<String>,
}

impl<'a> SvgInliner<'a> {
    pub fn new(theme: &'a ThemeConfig, source: &'a dyn SpriteSource) -> Self {
        Self {
            theme_roots: &theme.roots,
            document_root: &theme.document_root,
            source,
            cache: SvgInlineCache::default(),
            pending: Vec::new(),
        }
    }

    /// Whether `value` points into one of the theme trees.
    pub fn is_theme_sprite(&self, value: &str) -> bool {
        self.theme_roots.iter().any(|root| {
            value
                .strip_prefix(root.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Handle one `<use>` attribute value.
    ///
    /// Returns the replacement `#fragment`, or `None` for references outside
    /// the theme trees. The sprite file is queued for output the first time
    /// it is seen.
    pub fn inline_reference(&mut self, value: &str) -> Result<Option<String>, InlineError> {
        if !self.is_theme_sprite(value) {
            return Ok(None);
        }

        let (path, fragment) = split_reference(value)
            .ok_or_else(|| InlineError::Malformed(value.to_string()))?;
        let path = self
            .resolve(path)
            .ok_or_else(|| InlineError::Malformed(value.to_string()))?;

        match self.cache.entries.get(&path).copied() {
            Some(SpriteState::Inlined) => {}
            Some(SpriteState::Failed) => {
                return Err(InlineError::PreviouslyFailed(value.to_string()));
            }
            None => {
                let content = match self.source.read_sprite(&path) {
                    Ok(content) if content.trim().is_empty() => {
                        self.cache.entries.insert(path, SpriteState::Failed);
                        return Err(InlineError::Empty(value.to_string()));
                    }
                    Ok(content) => content,
                    Err(source) => {
                        self.cache.entries.insert(path, SpriteState::Failed);
                        return Err(InlineError::Unreadable {
                            value: value.to_string(),
                            source,
                        });
                    }
                };
                self.cache.entries.insert(path, SpriteState::Inlined);
                self.pending.push(hidden_container(&content));
            }
        }

        Ok(Some(format!("#{fragment}")))
    }

    /// Drain sprite markup queued since the last call.
    pub fn take_markup(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.pending).concat())
    }

    pub fn cache(&self) -> &SvgInlineCache {
        &self.cache
    }

    /// Absolute path under the document root; `..` is refused.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }
        Some(self.document_root.join(relative))
    }
}

/// Split `path[?query]#fragment`; both path and fragment are required.
fn split_reference(value: &str) -> Option<(&str, &str)> {
    let (path, fragment) = value.split_once('#')?;
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    if path.is_empty() || fragment.is_empty() {
        return None;
    }
    Some((path, fragment))
}

/// Sprites are kept out of the layout, they only need to exist in the DOM.
fn hidden_container(content: &str) -> String {
    format!(r#"<span style="display: none;">{content}</span>"#)
}
