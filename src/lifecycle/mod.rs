//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber (HTTP server) stops accepting → drains → exits
//! ```
//!
//! # Design Decisions
//! - Config reload is driven by the file watcher, not by SIGHUP
//! - One broadcast channel; late subscribers still see the signal if it
//!   has not been consumed

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
