//! Rivet Runtime - orchestration layer for the Rivet container.
//!
//! This crate provides:
//! - Layered configuration (`rivet.toml`, profiles, `RIVET_*` variables)
//! - Logging setup over `tracing-subscriber`
//! - Startup-condition checking with a timeout policy
//! - [`RivetRuntime`], which queues bindings, starts the container and
//!   stops it on Ctrl+C or SIGTERM
//!
//! ```ignore
//! use rivet_runtime::RivetRuntime;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = RivetRuntime::new();
//!     runtime.bind(BindingDescriptor::factory("pool", || Ok(Pool::new()))).await?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod startup;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, ContainerConfig, OnTimeout, RivetConfig,
    StartupConditionConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{RivetRuntime, RuntimeBuilder};
pub use startup::{StartupConditionChecker, StartupVerdict};

pub use tracing;
pub use tracing_subscriber;

/// Logging macros for crates built on the runtime.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
