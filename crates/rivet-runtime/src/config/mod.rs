//! Runtime configuration.
//!
//! TOML files and `RIVET_*` environment variables, layered with figment and
//! validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ContainerConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, OnTimeout, RivetConfig,
    SpanEventConfig, StartupConditionConfig,
};
pub use validation::validate_config;
