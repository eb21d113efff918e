//! Proxy awareness: where a request came from and how its public URLs look.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, forwarding headers)
//!     → detector.rs (is this a proxied request?)
//!     → prefix.rs (site prefix per language, cache contexts)
//!     → identity.rs (identity provider return URL)
//! ```

pub mod detector;
pub mod identity;
pub mod prefix;

pub use detector::is_proxy_request;
pub use prefix::SitePrefix;
