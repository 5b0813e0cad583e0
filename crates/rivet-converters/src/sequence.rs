//! Coercion into sequences.

use std::convert::Infallible;

use rivet_core::{
    ConversionContext, ConversionRegistry, FallbackResolver, Outcome, Sequence, TypeKey, Value,
};

/// Wraps a single value into a one-element [`Sequence`].
///
/// Applies only when the target is `Sequence`. An absent value becomes the
/// empty sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceCoercion;

impl FallbackResolver for SequenceCoercion {
    fn name(&self) -> &str {
        "sequence-coercion"
    }

    fn resolve(
        &self,
        target: TypeKey,
        value: &Value,
        _ctx: Option<&ConversionContext>,
        _registry: &ConversionRegistry,
    ) -> Outcome {
        if !target.is::<Sequence>() {
            return Outcome::NotApplicable;
        }
        let seq = match value {
            Value::Absent => Sequence::default(),
            Value::Sequence(s) => s.clone(),
            other => Sequence::new(vec![other.clone()]),
        };
        Outcome::success(seq)
    }

    fn can_promote(&self) -> bool {
        true
    }
}

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_converter(|items: &Vec<Value>, _| {
        Ok::<_, Infallible>(Sequence::new(items.clone()))
    });
    registry.add_fallback(SequenceCoercion);
}

#[cfg(test)]
mod tests {
    use rivet_core::Envelope;

    use super::*;

    #[test]
    fn test_wraps_single_values() {
        let registry = ConversionRegistry::with_default_fallbacks();
        register(&registry);

        let one = registry.convert_to::<Sequence>(&Value::from(5_i64), None).unwrap().unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one.get(0).and_then(|v| v.downcast_ref::<i64>()), Some(&5));

        let none = registry.convert(TypeKey::of::<Sequence>(), &Value::Absent, None);
        assert!(matches!(none, Outcome::Success(Value::Sequence(ref s)) if s.is_empty()));
    }

    #[test]
    fn test_envelope_is_wrapped_whole() {
        let registry = ConversionRegistry::with_default_fallbacks();
        register(&registry);

        let envelope = Value::from(Envelope::new(Value::from(true)).with_status(202));
        let seq = registry.convert_to::<Sequence>(&envelope, None).unwrap().unwrap();
        assert_eq!(seq.len(), 1);
        let inner = seq.get(0).and_then(Value::as_envelope);
        assert_eq!(inner.map(Envelope::status), Some(202));
    }

    #[test]
    fn test_vec_of_values_becomes_sequence() {
        let registry = ConversionRegistry::new();
        register(&registry);

        let items = Value::new(vec![Value::from("a"), Value::Absent]);
        let seq = registry.convert_to::<Sequence>(&items, None).unwrap().unwrap();
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_other_targets_not_applicable() {
        let registry = ConversionRegistry::new();
        let out = SequenceCoercion.resolve(TypeKey::of::<String>(), &Value::from(1_i64), None, &registry);
        assert!(out.is_not_applicable());
    }
}
