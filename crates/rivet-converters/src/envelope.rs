//! Envelope to bytes.

use std::sync::Arc;

use rivet_core::{
    ConversionContext, ConversionKey, ConversionRegistry, Envelope, Outcome, TypeKey, Value,
};
use tracing::trace;

/// Extracts the bytes of an envelope's entity.
///
/// Absent entities and entities nothing can turn into bytes both yield an
/// absent success; byte entities are returned without a lookup.
fn envelope_to_bytes(
    value: &Value,
    ctx: Option<&ConversionContext>,
    registry: &ConversionRegistry,
) -> Outcome {
    let Some(envelope) = value.as_envelope() else {
        return Outcome::NotApplicable;
    };
    let entity = envelope.entity();
    if entity.is_absent() {
        return Outcome::absent();
    }
    if entity.is::<Vec<u8>>() {
        return Outcome::Success(entity.clone());
    }

    let key = ConversionKey::new(entity.type_key(), TypeKey::of::<Vec<u8>>());
    match registry.lookup(&key) {
        Some(converter) => match converter(entity, ctx, registry) {
            Outcome::NotApplicable | Outcome::Indeterminate => Outcome::absent(),
            other => other,
        },
        None => {
            trace!(entity = %entity.type_key(), "no byte converter for envelope entity");
            Outcome::absent()
        }
    }
}

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_raw_converter(ConversionKey::of::<Envelope, Vec<u8>>(), Arc::new(envelope_to_bytes));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset;

    fn registry() -> ConversionRegistry {
        let registry = ConversionRegistry::with_default_fallbacks();
        register(&registry);
        charset::register(&registry);
        registry
    }

    #[test]
    fn test_entity_cases() {
        let registry = registry();

        let empty = Value::from(Envelope::empty());
        assert_eq!(registry.convert_to::<Vec<u8>>(&empty, None).unwrap(), None);

        let raw = Value::from(Envelope::new(Value::from(vec![1_u8, 2, 3])));
        let out = registry.convert_to::<Vec<u8>>(&raw, None).unwrap();
        assert_eq!(out.as_deref(), Some(&vec![1, 2, 3]));

        let text = Value::from(Envelope::new(Value::from("ok")).with_status(201));
        let out = registry.convert_to::<Vec<u8>>(&text, None).unwrap();
        assert_eq!(out.as_deref().map(Vec::as_slice), Some(&b"ok"[..]));

        let opaque = Value::from(Envelope::new(Value::from(true)));
        let out = registry.convert(TypeKey::of::<Vec<u8>>(), &opaque, None);
        assert!(matches!(out, Outcome::Success(Value::Absent)));
    }
}
