//! # Rivet Converters
//!
//! Standard direct converters and fallback resolvers for a
//! [`ConversionRegistry`].
//!
//! | Source | Target | Notes |
//! |--------|--------|-------|
//! | `String` | [`QualifiedName`] | `{namespace}local` or `local` |
//! | `String` | [`DataFormat`] | case-insensitive |
//! | [`Message`] | `String`, `Vec<u8>` | decoded with the context charset |
//! | `String` | `Vec<u8>` | encoded with the context charset |
//! | `Vec<u8>` | `String` | decoded with the context charset |
//! | `Envelope` | `Vec<u8>` | absent when nothing applies |
//! | `String`, `Vec<u8>` | `serde_json::Value` | |
//! | `String` | `i64`, `f64`, `bool` | trimmed |
//! | `Vec<Value>` | `Sequence` | |
//!
//! [`SequenceCoercion`] is appended to the fallback chain and wraps single
//! values when a `Sequence` is requested.

pub mod charset;
pub mod data_format;
pub mod envelope;
pub mod error;
pub mod json;
pub mod message;
pub mod qname;
pub mod scalar;
pub mod sequence;

use rivet_core::ConversionRegistry;
use tracing::debug;

pub use charset::Charset;
pub use data_format::DataFormat;
pub use error::{ConvertError, ConvertResult};
pub use message::{Message, StructuredMessage};
pub use qname::QualifiedName;
pub use sequence::SequenceCoercion;

/// Registers every standard converter and resolver with `registry`.
pub fn register_standard_converters(registry: &ConversionRegistry) {
    qname::register(registry);
    data_format::register(registry);
    charset::register(registry);
    message::register(registry);
    envelope::register(registry);
    json::register(registry);
    scalar::register(registry);
    sequence::register(registry);
    debug!(
        converters = registry.converter_count(),
        fallbacks = registry.fallback_count(),
        "registered standard converters"
    );
}

#[cfg(test)]
mod tests {
    use rivet_core::{ConversionContext, Envelope, Sequence, Value};

    use super::*;

    #[test]
    fn test_standard_set_works_together() {
        let registry = ConversionRegistry::with_default_fallbacks();
        register_standard_converters(&registry);

        let seq = Value::from(Sequence::new(vec![Value::Absent, Value::from("{urn:a}b")]));
        let q = registry.convert_to::<QualifiedName>(&seq, None).unwrap().unwrap();
        assert_eq!(q.namespace(), "urn:a");

        let env = Value::from(Envelope::new(Value::from("raw")));
        let format = registry.convert_to::<DataFormat>(&env, None).unwrap();
        assert_eq!(format.as_deref(), Some(&DataFormat::Raw));

        let ctx = ConversionContext::new().with_charset("US-ASCII");
        let bytes = registry.convert_to::<Vec<u8>>(&Value::from("é"), Some(&ctx));
        assert!(bytes.is_err());
    }
}
