//! # Rivet Core
//!
//! The core of the Rivet runtime: a type-conversion engine and a deferred
//! bean-binding registry, both owned by a [`Container`].
//!
//! ## Conversion
//!
//! Values travel as tagged [`Value`]s. A [`ConversionRegistry`] converts them
//! to a requested [`TypeKey`] by trying, in order, a cached route, the direct
//! converter registered for the `(source, target)` pair, and an ordered chain
//! of [`FallbackResolver`]s. Every attempt ends in an [`Outcome`]:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Success(v)` | `v` was produced (`v` may be `Value::Absent`) |
//! | `NotApplicable` | this resolver does not handle the input |
//! | `Indeterminate` | nobody could produce a value |
//! | `Failure(e)` | the input was recognised but conversion failed |
//!
//! ## Binding
//!
//! A [`BindingDescriptor`] names an id, an instance or factory, and optional
//! init/destroy hooks. The [`BeanBindingFactory`] turns it into a
//! [`DeferredBinding`]; the [`BeanLifecycleRegistry`] executes those in order
//! and tears the resulting beans down in reverse.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rivet_core::{BindingDescriptor, Container, Value};
//!
//! let container = Container::new("app");
//! container.conversions().add_converter(|s: &String, _| s.parse::<i64>());
//!
//! let n = container.convert_to::<i64>(&Value::from("42"), None)?;
//! assert_eq!(n.as_deref(), Some(&42));
//!
//! container.bind(BindingDescriptor::factory("pool", || Ok(Pool::new())))?;
//! container.stop()?;
//! ```

pub mod bean;
pub mod binding;
pub mod container;
pub mod conversion;
pub mod error;
pub mod lifecycle;
pub mod value;

pub use bean::{Bean, BeanBuilder, ContainerAware, HookTarget, PostInit, PreInit, StartupCondition};
pub use binding::{BeanBindingFactory, BeanFactory, BindingDescriptor, DeferredBinding, Provider};
pub use container::{Container, ContainerStatus};
pub use conversion::{
    ConversionContext, ConversionKey, ConversionRegistry, ConversionStats, ConverterFn,
    DirectConverterCatalog, EnvelopeUnwrap, FallbackChain, FallbackEntry, FallbackFn,
    FallbackResolver, Outcome, SequenceUnwrap,
};
pub use error::{
    BindingError, BindingResult, BoxError, ConversionError, ConversionResult, InitPhase,
    LifecycleError, ShutdownError,
};
pub use lifecycle::{BeanLifecycleRegistry, BindingState, ExecutionReport, LifecycleEntry};
pub use value::{Absent, Envelope, Scalar, Sequence, TypeKey, Value, ValueKind};
