//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated)
//!     → ProxySettings stored in an ArcSwap, snapshot per request
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<ProxySettings>
//! ```
//!
//! # Design Decisions
//! - Only `ProxySettings` is hot reloaded; listener and origin need a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AppConfig, FrontPageConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, OriginConfig,
    ProxySettings, ThemeConfig, TimeoutConfig,
};
