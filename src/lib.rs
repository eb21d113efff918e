//! Asset rewrite proxy library.
//!
//! Sits in front of an origin application that is served to the public
//! under a shared hostname and a per-site path prefix, and rewrites the
//! origin's HTML and JSON responses so that asset URLs resolve against the
//! canonical host.

pub mod config;
pub mod environment;
pub mod hostname;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod rewrite;

pub use config::schema::AppConfig;
pub use environment::Environment;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
