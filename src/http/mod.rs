//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (request ID)
//!     → server.rs (router, tracing, timeout)
//!     → middleware/asset_rewrite.rs (wraps every handler)
//!         → front.rs (`GET /`, when enabled)
//!         → identity.rs (`GET /_proxy/tunnistamo-return-url`)
//!         → server.rs forward handler (everything else, to the origin)
//!     → Send to client
//! ```

pub mod front;
pub mod identity;
pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::{asset_rewrite_middleware, RewriteState};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer, ServerError};
