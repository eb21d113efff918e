//! Proxy context detection.
//!
//! # Design Decisions
//! - No site prefixes configured means the origin is served directly
//! - Forwarding headers from the fronting proxy mark a proxied request
//! - A path under a public site prefix marks a proxied request
//! - Side-effect free; evaluated before the wrapped handler runs

use axum::http::Request;

use crate::config::ProxySettings;
use crate::proxy::prefix::SitePrefix;

/// Header set by the fronting proxy with the public host.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
/// Header set by the fronting proxy with the client address.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Whether the response to this request must be rewritten.
pub fn is_proxy_request<B>(request: &Request<B>, settings: &ProxySettings) -> bool {
    if settings.prefixes.is_empty() {
        return false;
    }

    let headers = request.headers();
    if headers.contains_key(X_FORWARDED_HOST) || headers.contains_key(X_FORWARDED_FOR) {
        return true;
    }

    SitePrefix::new(settings)
        .language_of(request.uri().path())
        .is_some()
}
