//! # Rivet
//!
//! A decoupled integration container: typed value conversion and ordered
//! bean lifecycles.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────────────────────────────────┐
//! │ RivetRuntime │────▶│ Container                                     │
//! │ (config,     │     │  ├─ ConversionRegistry ─▶ catalog + fallbacks │
//! │  logging,    │     │  └─ BeanLifecycleRegistry ─▶ ordered beans    │
//! │  startup)    │     └───────────────────────────────────────────────┘
//! └──────────────┘
//! ```
//!
//! - **Conversion**: direct converters keyed by `(source, target)`, then an
//!   ordered fallback chain; successful routes are cached
//! - **Binding**: descriptors become deferred bindings that execute on start
//! - **Lifecycle**: destroy hooks run in reverse creation order on stop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rivet::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = RivetRuntime::new();
//!     runtime
//!         .bind(BindingDescriptor::factory("pool", || Ok(Pool::new())).with_destroy_hook("close"))
//!         .await?;
//!
//!     let name = runtime.convert_to::<QualifiedName>(&Value::from("{urn:orders}order"))?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `json-log`: JSON log output

pub use rivet_converters as converters;
pub use rivet_core as core;
pub use rivet_runtime as runtime;

/// Commonly used types.
///
/// ```rust,ignore
/// use rivet::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use rivet_runtime::{OnTimeout, RivetConfig, RivetRuntime, RuntimeError, RuntimeResult};

    // Container and values
    pub use rivet_core::{Container, ContainerStatus, Envelope, Sequence, TypeKey, Value};

    // Conversion
    pub use rivet_core::{
        ConversionContext, ConversionError, ConversionRegistry, FallbackResolver, Outcome,
    };

    // Beans and bindings
    pub use rivet_core::{
        Bean, BindingDescriptor, BoxError, ContainerAware, HookTarget, PostInit, PreInit,
        StartupCondition,
    };

    // Standard converter types
    pub use rivet_converters::{Charset, DataFormat, Message, QualifiedName, StructuredMessage};

    pub use rivet_runtime::prelude::*;
}
