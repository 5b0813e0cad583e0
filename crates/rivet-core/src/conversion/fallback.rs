//! Fallback resolvers consulted when no direct converter matches.
//!
//! The chain is walked in registration order. The first resolver returning
//! anything other than [`Outcome::NotApplicable`] decides the result; an
//! exhausted chain yields [`Outcome::Indeterminate`].

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use super::context::ConversionContext;
use super::outcome::{ConversionKey, Outcome};
use super::registry::ConversionRegistry;
use crate::value::{Sequence, TypeKey, Value};

/// A general-purpose resolver in the fallback chain.
pub trait FallbackResolver: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Attempts to convert `value` into `target`.
    ///
    /// Resolvers may call back into `registry` for nested values and must not
    /// return [`Outcome::NotApplicable`] for inputs they recognise.
    fn resolve(
        &self,
        target: TypeKey,
        value: &Value,
        ctx: Option<&ConversionContext>,
        registry: &ConversionRegistry,
    ) -> Outcome;

    /// Whether the same input always resolves the same way.
    fn is_pure(&self) -> bool {
        true
    }

    /// Whether a success may be promoted into the route cache.
    fn can_promote(&self) -> bool {
        false
    }
}

/// A resolver together with its position in the chain.
#[derive(Clone)]
pub struct FallbackEntry {
    priority: usize,
    resolver: Arc<dyn FallbackResolver>,
}

impl FallbackEntry {
    /// Registration order, starting at zero.
    pub fn priority(&self) -> usize {
        self.priority
    }

    /// The resolver itself.
    pub fn resolver(&self) -> &Arc<dyn FallbackResolver> {
        &self.resolver
    }

    /// Whether successes of this entry may be cached.
    pub fn is_cacheable(&self) -> bool {
        self.resolver.is_pure() && self.resolver.can_promote()
    }
}

impl fmt::Debug for FallbackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackEntry")
            .field("priority", &self.priority)
            .field("resolver", &self.resolver.name())
            .finish()
    }
}

/// Ordered list of fallback resolvers.
#[derive(Clone, Default, Debug)]
pub struct FallbackChain {
    entries: Vec<FallbackEntry>,
}

impl FallbackChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resolver after every existing one.
    pub fn push(&mut self, resolver: Arc<dyn FallbackResolver>) {
        let priority = self.entries.len();
        self.entries.push(FallbackEntry { priority, resolver });
    }

    /// Iterates over the entries in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FallbackEntry> {
        self.entries.iter()
    }

    /// Number of resolvers in the chain.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the resolver names in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.resolver.name()).collect()
    }
}

// ============================================================================
// Closure resolver
// ============================================================================

type ResolveFn = dyn Fn(TypeKey, &Value, Option<&ConversionContext>, &ConversionRegistry) -> Outcome
    + Send
    + Sync;

/// A resolver backed by a closure.
pub struct FallbackFn {
    name: String,
    pure: bool,
    promote: bool,
    f: Box<ResolveFn>,
}

impl FallbackFn {
    /// Creates a pure, non-promoting resolver.
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(TypeKey, &Value, Option<&ConversionContext>, &ConversionRegistry) -> Outcome
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            pure: true,
            promote: false,
            f: Box::new(f),
        }
    }

    /// Marks the resolver as impure; its results are never cached.
    pub fn impure(mut self) -> Self {
        self.pure = false;
        self
    }

    /// Allows successes to be promoted into the route cache.
    pub fn promotable(mut self) -> Self {
        self.promote = true;
        self
    }
}

impl FallbackResolver for FallbackFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolve(
        &self,
        target: TypeKey,
        value: &Value,
        ctx: Option<&ConversionContext>,
        registry: &ConversionRegistry,
    ) -> Outcome {
        (self.f)(target, value, ctx, registry)
    }

    fn is_pure(&self) -> bool {
        self.pure
    }

    fn can_promote(&self) -> bool {
        self.promote
    }
}

// ============================================================================
// Built-in resolvers
// ============================================================================

/// Converts a sequence through its first non-absent element.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceUnwrap;

impl FallbackResolver for SequenceUnwrap {
    fn name(&self) -> &str {
        "sequence-unwrap"
    }

    fn resolve(
        &self,
        target: TypeKey,
        value: &Value,
        ctx: Option<&ConversionContext>,
        registry: &ConversionRegistry,
    ) -> Outcome {
        let Some(seq) = value.as_sequence() else {
            return Outcome::NotApplicable;
        };
        match seq.first_present() {
            Some(element) => {
                trace!(len = seq.len(), target = %target, "unwrapping sequence element");
                registry.convert(target, element, ctx)
            }
            None => Outcome::Indeterminate,
        }
    }
}

/// Converts an envelope through its embedded entity.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeUnwrap;

impl FallbackResolver for EnvelopeUnwrap {
    fn name(&self) -> &str {
        "envelope-unwrap"
    }

    fn resolve(
        &self,
        target: TypeKey,
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
        let key = ConversionKey::new(entity.type_key(), target);
        if key.is_identity() {
            return Outcome::Success(entity.clone());
        }
        match registry.lookup(&key) {
            Some(converter) => {
                trace!(%key, status = envelope.status(), "delegating envelope entity");
                match converter(entity, ctx, registry) {
                    Outcome::NotApplicable => Outcome::Indeterminate,
                    other => other,
                }
            }
            // Leave sequence targets to later resolvers that wrap the envelope.
            None if target.is::<Sequence>() => Outcome::NotApplicable,
            None => Outcome::Indeterminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::value::Envelope;

    fn registry() -> ConversionRegistry {
        let registry = ConversionRegistry::new();
        registry.add_converter(|s: &String, _| Ok::<_, Infallible>(s.len() as i64));
        registry
    }

    #[test]
    fn test_sequence_unwrap_picks_first_present() {
        let registry = registry();
        let seq = Value::from(Sequence::new(vec![
            Value::Absent,
            Value::from("hello"),
            Value::from("ignored"),
        ]));
        let out = SequenceUnwrap.resolve(TypeKey::of::<String>(), &seq, None, &registry);
        assert_eq!(out.value().and_then(Value::as_str), Some("hello"));
    }

    #[test]
    fn test_sequence_unwrap_empty_or_all_absent_is_indeterminate() {
        let registry = registry();
        let target = TypeKey::of::<String>();
        let empty = Value::from(Sequence::default());
        let all_absent = Value::from(Sequence::new(vec![Value::Absent, Value::Absent]));
        assert!(SequenceUnwrap.resolve(target, &empty, None, &registry).is_indeterminate());
        assert!(SequenceUnwrap.resolve(target, &all_absent, None, &registry).is_indeterminate());
        assert!(SequenceUnwrap
            .resolve(target, &Value::from("x"), None, &registry)
            .is_not_applicable());
    }

    #[test]
    fn test_envelope_unwrap_cases() {
        let registry = registry();
        let target = TypeKey::of::<i64>();

        let absent = Value::from(Envelope::empty());
        assert!(matches!(
            EnvelopeUnwrap.resolve(target, &absent, None, &registry),
            Outcome::Success(Value::Absent)
        ));

        let text = Value::from(Envelope::new(Value::from("four")));
        let out = EnvelopeUnwrap.resolve(target, &text, None, &registry);
        assert_eq!(out.value().and_then(|v| v.downcast_ref::<i64>()), Some(&4));

        let unconvertible = Value::from(Envelope::new(Value::from(true)));
        assert!(EnvelopeUnwrap
            .resolve(target, &unconvertible, None, &registry)
            .is_indeterminate());
        assert!(EnvelopeUnwrap
            .resolve(TypeKey::of::<Sequence>(), &unconvertible, None, &registry)
            .is_not_applicable());

        let same = Value::from(Envelope::new(Value::from(8_i64)));
        let out = EnvelopeUnwrap.resolve(target, &same, None, &registry);
        assert_eq!(out.value().and_then(|v| v.downcast_ref::<i64>()), Some(&8));
    }

    #[test]
    fn test_chain_keeps_registration_order() {
        let mut chain = FallbackChain::new();
        chain.push(Arc::new(SequenceUnwrap));
        chain.push(Arc::new(EnvelopeUnwrap));
        assert_eq!(chain.names(), vec!["sequence-unwrap", "envelope-unwrap"]);
        assert_eq!(chain.iter().map(FallbackEntry::priority).collect::<Vec<_>>(), vec![0, 1]);
    }
}
