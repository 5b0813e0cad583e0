//! Conversion keys and outcomes.

use std::fmt;

use crate::error::{ConversionError, ConversionResult};
use crate::value::{TypeKey, Value};

// ============================================================================
// ConversionKey
// ============================================================================

/// The `(source, target)` pair a converter is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversionKey {
    source: TypeKey,
    target: TypeKey,
}

impl ConversionKey {
    /// Creates a key from two type keys.
    pub fn new(source: TypeKey, target: TypeKey) -> Self {
        Self { source, target }
    }

    /// Creates the key converting `S` into `T`.
    pub fn of<S: 'static, T: 'static>() -> Self {
        Self::new(TypeKey::of::<S>(), TypeKey::of::<T>())
    }

    /// Returns the source type.
    pub fn source(&self) -> TypeKey {
        self.source
    }

    /// Returns the target type.
    pub fn target(&self) -> TypeKey {
        self.target
    }

    /// Returns `true` when source and target are the same type.
    pub fn is_identity(&self) -> bool {
        self.source == self.target
    }
}

impl fmt::Display for ConversionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of a single conversion attempt.
///
/// `NotApplicable` and `Indeterminate` are not errors: the first means "this
/// resolver does not handle the input, ask the next one", the second means
/// "nobody could produce a value". Only [`Outcome::Failure`] carries an error.
#[derive(Debug)]
pub enum Outcome {
    /// The conversion produced a value, possibly [`Value::Absent`].
    Success(Value),
    /// The resolver does not handle this input.
    NotApplicable,
    /// No value could be determined.
    Indeterminate,
    /// The input was recognised but the transformation failed.
    Failure(ConversionError),
}

impl Outcome {
    /// Wraps `value` as a success.
    pub fn success(value: impl Into<Value>) -> Self {
        Self::Success(value.into())
    }

    /// A success whose value denotes "nothing".
    pub fn absent() -> Self {
        Self::Success(Value::Absent)
    }

    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` for [`Outcome::NotApplicable`].
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }

    /// Returns `true` for [`Outcome::Indeterminate`].
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Indeterminate)
    }

    /// Returns `true` for [`Outcome::Failure`].
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Returns the produced value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the outcome and returns the produced value, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Success(v) => Some(v),
            _ => None,
        }
    }

    /// Folds the outcome into a `Result`.
    ///
    /// `Ok(None)` means no value was determined.
    pub fn into_result(self) -> ConversionResult<Option<Value>> {
        match self {
            Self::Success(v) => Ok(Some(v)),
            Self::NotApplicable | Self::Indeterminate => Ok(None),
            Self::Failure(e) => Err(e),
        }
    }
}

impl From<ConversionError> for Outcome {
    fn from(err: ConversionError) -> Self {
        Self::Failure(err)
    }
}
