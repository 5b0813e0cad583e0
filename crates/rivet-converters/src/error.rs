//! Errors raised by the standard converters.
//!
//! These are the causes wrapped inside `ConversionError::Failed`; callers
//! can downcast the error source back to [`ConvertError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    /// The text is not `local` or `{namespace}local`.
    #[error("invalid qualified name '{input}'")]
    InvalidQualifiedName { input: String },

    #[error("unknown data format '{name}'")]
    UnknownDataFormat { name: String },

    #[error("unsupported charset '{name}'")]
    UnsupportedCharset { name: String },

    /// A character has no representation in the target charset.
    #[error("character {ch:?} cannot be encoded as {charset}")]
    Unmappable { charset: &'static str, ch: char },

    /// Bytes are not valid in the source charset.
    #[error("invalid {charset} byte sequence at offset {offset}")]
    Malformed { charset: &'static str, offset: usize },
}

pub type ConvertResult<T> = Result<T, ConvertError>;
