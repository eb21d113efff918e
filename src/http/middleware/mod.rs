//! HTTP middleware.

pub mod asset_rewrite;

pub use asset_rewrite::{asset_rewrite_middleware, RewriteState};
