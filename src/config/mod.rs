//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → overrides.rs (command-line flags)
//!     → validation.rs (semantic checks)
//!     → RecorderConfig (validated, immutable)
//!     → handed to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod overrides;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use overrides::CliOverrides;
pub use schema::{
    CaptureConfig, ObservabilityConfig, ProxyListenerConfig, QueryListenerConfig,
    RecorderConfig, StoreConfig,
};
