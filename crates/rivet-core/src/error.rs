//! Error types for the Rivet core.
//!
//! `NotApplicable` and `Indeterminate` are ordinary [`Outcome`] values and
//! never appear here. Everything in this module is a genuine failure that is
//! handed back to the caller with its original cause attached.
//!
//! [`Outcome`]: crate::conversion::Outcome

use std::fmt;

use thiserror::Error;

use crate::conversion::ConversionKey;

/// Boxed error used to carry the original cause of a failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Conversion Errors
// =============================================================================

/// Errors produced while converting a value.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// A converter recognised the input but the transformation itself failed.
    #[error("failed to convert {from} to {to}")]
    Failed {
        /// Source type name.
        from: &'static str,
        /// Target type name.
        to: &'static str,
        /// The error raised by the converter, unmodified.
        #[source]
        cause: BoxError,
    },

    /// No converter could produce a value (only raised by mandatory conversion).
    #[error("no converter available from {from} to {to}")]
    NoConverter {
        /// Source type name.
        from: &'static str,
        /// Target type name.
        to: &'static str,
    },

    /// A converter produced a value of the wrong type.
    #[error("converter produced {actual}, expected {expected}")]
    TypeMismatch {
        /// Requested type name.
        expected: &'static str,
        /// Produced type name.
        actual: &'static str,
    },
}

impl ConversionError {
    /// Wraps `cause` as the failure of the conversion described by `key`.
    pub fn failed(key: ConversionKey, cause: impl Into<BoxError>) -> Self {
        Self::Failed {
            from: key.source().name(),
            to: key.target().name(),
            cause: cause.into(),
        }
    }

    /// Creates a missing-converter error for `key`.
    pub fn no_converter(key: ConversionKey) -> Self {
        Self::NoConverter {
            from: key.source().name(),
            to: key.target().name(),
        }
    }

    /// Returns the original cause when this is a [`ConversionError::Failed`].
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Failed { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// Result type for conversion operations.
pub type ConversionResult<T> = Result<T, ConversionError>;

// =============================================================================
// Binding Errors
// =============================================================================

/// The post-processing phase that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    /// Runs before the bean is considered initialised.
    PreInit,
    /// Runs after the pre-init phase succeeded.
    PostInit,
}

impl fmt::Display for InitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreInit => f.write_str("pre-init"),
            Self::PostInit => f.write_str("post-init"),
        }
    }
}

/// Errors raised while executing a deferred binding.
///
/// Every variant is attributed to the binding id that failed.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The factory closure could not produce an instance.
    #[error("binding '{id}': factory failed to produce an instance")]
    Factory {
        /// Binding id.
        id: String,
        /// The factory's error.
        #[source]
        cause: BoxError,
    },

    /// A post-processing phase failed.
    #[error("binding '{id}': {phase} post-processing failed")]
    PostProcess {
        /// Binding id.
        id: String,
        /// Which phase failed.
        phase: InitPhase,
        /// The hook's error.
        #[source]
        cause: BoxError,
    },

    /// The declared init hook failed.
    #[error("binding '{id}': init hook '{hook}' failed")]
    InitHook {
        /// Binding id.
        id: String,
        /// Hook name.
        hook: String,
        /// The hook's error.
        #[source]
        cause: BoxError,
    },

    /// A hook was declared but the bean cannot receive named hooks.
    #[error("binding '{id}': bean does not accept hook '{hook}'")]
    UnknownHook {
        /// Binding id.
        id: String,
        /// Hook name.
        hook: String,
    },
}

impl BindingError {
    /// Returns the id of the binding that failed.
    pub fn id(&self) -> &str {
        match self {
            Self::Factory { id, .. }
            | Self::PostProcess { id, .. }
            | Self::InitHook { id, .. }
            | Self::UnknownHook { id, .. } => id,
        }
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;

// =============================================================================
// Lifecycle Errors
// =============================================================================

/// A destroy hook failed during shutdown.
#[derive(Debug, Error)]
#[error("binding '{id}': destroy hook '{hook}' failed")]
pub struct LifecycleError {
    /// Binding id.
    pub id: String,
    /// Hook name.
    pub hook: String,
    /// The hook's error.
    #[source]
    pub cause: BoxError,
}

/// Every destroy-hook failure collected during one shutdown.
#[derive(Debug, Error)]
#[error("{} destroy hook(s) failed during shutdown", .failures.len())]
pub struct ShutdownError {
    /// Failures in the order the hooks ran.
    pub failures: Vec<LifecycleError>,
}

impl ShutdownError {
    /// Returns the ids whose destroy hook failed.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }
}
