//! Response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered response body + ContentKind
//!     → transformer.rs (dispatch: HTML / JSON fragments / opaque)
//!     → document.rs (streaming markup passes)
//!         → rules.rs (tag/attribute → public URL)
//!         → svg.rs (theme sprite → inlined markup + #fragment)
//!     → Outcome (rewritten body or passthrough reason)
//! ```

pub mod document;
pub mod rules;
pub mod svg;
pub mod transformer;

#[cfg(test)]
pub(crate) mod test_support;

pub use document::{Markup, RewriteError};
pub use rules::{RewriteRule, UrlRewriter, REWRITE_RULES};
pub use svg::{FsSpriteSource, InlineError, SpriteSource, SvgInlineCache, SvgInliner};
pub use transformer::{ContentKind, Outcome, Passthrough, ResponseTransformer};
