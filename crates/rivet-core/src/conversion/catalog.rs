//! Direct converter catalog.
//!
//! The catalog maps a [`ConversionKey`] to exactly one converter. It is an
//! immutable snapshot: the registry clones it, inserts, and swaps the new
//! snapshot in, so readers never take a lock.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use super::context::ConversionContext;
use super::outcome::{ConversionKey, Outcome};
use super::registry::ConversionRegistry;
use crate::error::{BoxError, ConversionError};
use crate::value::Value;

/// A type-erased direct converter.
///
/// Converters receive the registry so they may delegate nested conversions.
pub type ConverterFn =
    Arc<dyn Fn(&Value, Option<&ConversionContext>, &ConversionRegistry) -> Outcome + Send + Sync>;

/// Index of direct converters keyed by `(source, target)`.
#[derive(Clone, Default)]
pub struct DirectConverterCatalog {
    converters: HashMap<ConversionKey, ConverterFn>,
}

impl DirectConverterCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a converter, returning the one it replaced.
    pub fn insert(&mut self, key: ConversionKey, converter: ConverterFn) -> Option<ConverterFn> {
        self.converters.insert(key, converter)
    }

    /// Returns the converter registered for `key`.
    pub fn get(&self, key: &ConversionKey) -> Option<&ConverterFn> {
        self.converters.get(key)
    }

    /// Returns `true` if a converter is registered for `key`.
    pub fn contains(&self, key: &ConversionKey) -> bool {
        self.converters.contains_key(key)
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Returns `true` if no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Iterates over the registered keys.
    pub fn keys(&self) -> impl Iterator<Item = &ConversionKey> {
        self.converters.keys()
    }
}

impl std::fmt::Debug for DirectConverterCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.converters.keys()).finish()
    }
}

// ============================================================================
// Typed adapters
// ============================================================================

/// Wraps a typed closure as a [`ConverterFn`].
///
/// Inputs that are not an `S` yield [`Outcome::NotApplicable`]; an `Err`
/// from the closure becomes [`Outcome::Failure`] with the error as its source.
pub fn typed_converter<S, T, E, F>(f: F) -> ConverterFn
where
    S: Any,
    T: Any + Send + Sync,
    E: Into<BoxError> + 'static,
    F: Fn(&S, Option<&ConversionContext>) -> Result<T, E> + Send + Sync + 'static,
{
    let key = ConversionKey::of::<S, T>();
    Arc::new(
        move |value: &Value, ctx: Option<&ConversionContext>, _: &ConversionRegistry| {
            let Some(input) = value.downcast_ref::<S>() else {
                return Outcome::NotApplicable;
            };
            match f(input, ctx) {
                Ok(out) => Outcome::Success(Value::new(out)),
                Err(e) => Outcome::Failure(ConversionError::failed(key, e)),
            }
        },
    )
}

/// Like [`typed_converter`], but `Ok(None)` is a successful absent value.
pub fn nullable_converter<S, T, E, F>(f: F) -> ConverterFn
where
    S: Any,
    T: Any + Send + Sync,
    E: Into<BoxError> + 'static,
    F: Fn(&S, Option<&ConversionContext>) -> Result<Option<T>, E> + Send + Sync + 'static,
{
    let key = ConversionKey::of::<S, T>();
    Arc::new(
        move |value: &Value, ctx: Option<&ConversionContext>, _: &ConversionRegistry| {
            let Some(input) = value.downcast_ref::<S>() else {
                return Outcome::NotApplicable;
            };
            match f(input, ctx) {
                Ok(Some(out)) => Outcome::Success(Value::new(out)),
                Ok(None) => Outcome::absent(),
                Err(e) => Outcome::Failure(ConversionError::failed(key, e)),
            }
        },
    )
}
