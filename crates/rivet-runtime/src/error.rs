//! Runtime error types.

use rivet_core::{BindingError, BoxError, ShutdownError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while running a container.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A critical binding failed and start was halted.
    #[error("Start halted by critical binding '{id}'")]
    StartHalted {
        id: String,
        #[source]
        cause: BindingError,
    },

    /// One or more destroy hooks failed while stopping.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    /// A startup condition did not pass in time and the policy is `fail`.
    #[error("Startup condition '{name}' cannot continue: {message}")]
    StartupConditionFailed { name: String, message: String },

    /// A startup condition raised an error while being checked.
    #[error("Startup condition '{name}' failed while checking")]
    StartupConditionError {
        name: String,
        #[source]
        cause: BoxError,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
