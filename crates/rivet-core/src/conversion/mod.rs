//! Type conversion engine.
//!
//! - [`outcome`]: conversion keys and the four-way [`Outcome`]
//! - [`context`]: optional per-call [`ConversionContext`]
//! - [`catalog`]: direct converters keyed by `(source, target)`
//! - [`fallback`]: the ordered chain of general-purpose resolvers
//! - [`registry`]: the [`ConversionRegistry`] tying them together

pub mod catalog;
pub mod context;
pub mod fallback;
pub mod outcome;
pub mod registry;

pub use catalog::{ConverterFn, DirectConverterCatalog, nullable_converter, typed_converter};
pub use context::{ConversionContext, DEFAULT_CHARSET};
pub use fallback::{EnvelopeUnwrap, FallbackChain, FallbackEntry, FallbackFn, FallbackResolver, SequenceUnwrap};
pub use outcome::{ConversionKey, Outcome};
pub use registry::{ConversionRegistry, ConversionStats};
