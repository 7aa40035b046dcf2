//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → version registry rebuilt from its [[groups]]
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → new ServiceSnapshot built and swapped in atomically
//!     → in-flight requests finish on the old snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Route bindings live in code; config only carries version lifecycle

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_or_default, parse_config, ConfigError};
pub use schema::{
    AdminConfig, GroupConfig, ListenerConfig, LogFormat, NegotiationConfig, ObservabilityConfig,
    ServiceConfig, TimeoutConfig, VersionConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
