//! The conversion registry.
//!
//! [`ConversionRegistry`] is the single entry point for conversions. A call to
//! [`convert`](ConversionRegistry::convert) runs these steps:
//!
//! 1. identity: a value already of the target shape is returned as is;
//! 2. cached route: a strategy that succeeded before for the same key;
//! 3. the direct converter registered for the key;
//! 4. the fallback chain, in registration order.
//!
//! The cache stores *routes*, not values. Only routes that produced a
//! [`Outcome::Success`] are cached. A cached route that later fails returns
//! its failure; one that declines lets the search continue past it.
//!
//! Every registration bumps a generation counter. Cached routes are tagged
//! with the generation they were computed under and ignored once it moves on,
//! so a conversion racing a registration cannot revive a replaced converter.
//!
//! # Concurrency
//!
//! The catalog and the chain are [`ArcSwap`] snapshots, the cache is a
//! [`DashMap`]. The read path never takes a global lock. Two threads missing
//! the cache for the same key both compute the route, and the later write wins.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::catalog::{ConverterFn, DirectConverterCatalog, nullable_converter, typed_converter};
use super::context::ConversionContext;
use super::fallback::{EnvelopeUnwrap, FallbackChain, FallbackEntry, FallbackResolver, SequenceUnwrap};
use super::outcome::{ConversionKey, Outcome};
use crate::error::{BoxError, ConversionError, ConversionResult};
use crate::value::{TypeKey, Value};

/// A strategy that produced a success for some key.
#[derive(Clone)]
enum Route {
    Direct(ConverterFn),
    Fallback(FallbackEntry),
}

impl Route {
    fn run(
        &self,
        target: TypeKey,
        value: &Value,
        ctx: Option<&ConversionContext>,
        registry: &ConversionRegistry,
    ) -> Outcome {
        match self {
            Self::Direct(f) => f(value, ctx, registry),
            Self::Fallback(entry) => entry.resolver().resolve(target, value, ctx, registry),
        }
    }

    fn is_direct(&self, converter: &ConverterFn) -> bool {
        matches!(self, Self::Direct(f) if Arc::ptr_eq(f, converter))
    }

    fn is_fallback(&self, entry: &FallbackEntry) -> bool {
        matches!(self, Self::Fallback(e) if Arc::ptr_eq(e.resolver(), entry.resolver()))
    }
}

#[derive(Clone)]
struct CachedRoute {
    generation: u64,
    route: Route,
}

// ============================================================================
// Statistics
// ============================================================================

#[derive(Default)]
struct Counters {
    attempts: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
    cache_hits: AtomicU64,
}

/// Snapshot of the registry's conversion counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Calls to `convert`, nested calls included.
    pub attempts: u64,
    /// Calls that ended in a success.
    pub hits: u64,
    /// Calls that ended indeterminate.
    pub misses: u64,
    /// Calls that ended in a failure.
    pub failures: u64,
    /// Successes served by a cached route.
    pub cache_hits: u64,
}

impl fmt::Display for ConversionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempts={}, hits={}, misses={}, failures={}, cache_hits={}",
            self.attempts, self.hits, self.misses, self.failures, self.cache_hits
        )
    }
}

// ============================================================================
// ConversionRegistry
// ============================================================================

/// Orchestrates direct converters, the fallback chain, and the route cache.
pub struct ConversionRegistry {
    catalog: ArcSwap<DirectConverterCatalog>,
    fallbacks: ArcSwap<FallbackChain>,
    cache: DashMap<ConversionKey, CachedRoute>,
    generation: AtomicU64,
    counters: Counters,
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionRegistry {
    /// Creates a registry with no converters and an empty chain.
    pub fn new() -> Self {
        Self {
            catalog: ArcSwap::from_pointee(DirectConverterCatalog::new()),
            fallbacks: ArcSwap::from_pointee(FallbackChain::new()),
            cache: DashMap::new(),
            generation: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    /// Creates a registry whose chain starts with [`SequenceUnwrap`] then
    /// [`EnvelopeUnwrap`].
    pub fn with_default_fallbacks() -> Self {
        let registry = Self::new();
        registry.add_fallback(SequenceUnwrap);
        registry.add_fallback(EnvelopeUnwrap);
        registry
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Registers a typed direct converter from `S` to `T`.
    pub fn add_converter<S, T, E, F>(&self, f: F)
    where
        S: Any,
        T: Any + Send + Sync,
        E: Into<BoxError> + 'static,
        F: Fn(&S, Option<&ConversionContext>) -> Result<T, E> + Send + Sync + 'static,
    {
        self.add_raw_converter(ConversionKey::of::<S, T>(), typed_converter(f));
    }

    /// Registers a direct converter whose `None` result is an absent success.
    pub fn add_nullable_converter<S, T, E, F>(&self, f: F)
    where
        S: Any,
        T: Any + Send + Sync,
        E: Into<BoxError> + 'static,
        F: Fn(&S, Option<&ConversionContext>) -> Result<Option<T>, E> + Send + Sync + 'static,
    {
        self.add_raw_converter(ConversionKey::of::<S, T>(), nullable_converter(f));
    }

    /// Registers a type-erased converter under `key`, replacing any previous one.
    pub fn add_raw_converter(&self, key: ConversionKey, converter: ConverterFn) {
        self.catalog.rcu(|current| {
            let mut next = DirectConverterCatalog::clone(current);
            next.insert(key, Arc::clone(&converter));
            next
        });
        self.invalidate_routes();
        debug!(%key, "registered direct converter");
    }

    /// Appends a resolver to the end of the fallback chain.
    pub fn add_fallback<R: FallbackResolver + 'static>(&self, resolver: R) {
        self.add_shared_fallback(Arc::new(resolver));
    }

    /// Appends an already shared resolver to the fallback chain.
    pub fn add_shared_fallback(&self, resolver: Arc<dyn FallbackResolver>) {
        let name = resolver.name().to_string();
        self.fallbacks.rcu(|current| {
            let mut next = FallbackChain::clone(current);
            next.push(Arc::clone(&resolver));
            next
        });
        self.invalidate_routes();
        debug!(resolver = %name, "registered fallback resolver");
    }

    fn invalidate_routes(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.clear();
    }

    /// Returns the direct converter registered for `key`.
    pub fn lookup(&self, key: &ConversionKey) -> Option<ConverterFn> {
        self.catalog.load().get(key).cloned()
    }

    /// Returns `true` if a direct converter is registered for `key`.
    pub fn has_converter(&self, key: &ConversionKey) -> bool {
        self.catalog.load().contains(key)
    }

    /// Number of direct converters.
    pub fn converter_count(&self) -> usize {
        self.catalog.load().len()
    }

    /// Number of fallback resolvers.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks.load().len()
    }

    /// Names of the fallback resolvers in chain order.
    pub fn fallback_names(&self) -> Vec<String> {
        self.fallbacks
            .load()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // ------------------------------------------------------------------------
    // Conversion
    // ------------------------------------------------------------------------

    /// Converts `value` into `target`.
    ///
    /// Never returns [`Outcome::NotApplicable`].
    pub fn convert(&self, target: TypeKey, value: &Value, ctx: Option<&ConversionContext>) -> Outcome {
        self.counters.attempts.fetch_add(1, Ordering::Relaxed);
        let outcome = self.resolve(target, value, ctx);
        let counter = match &outcome {
            Outcome::Success(_) => &self.counters.hits,
            Outcome::Failure(_) => &self.counters.failures,
            Outcome::Indeterminate | Outcome::NotApplicable => &self.counters.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        outcome
    }

    fn resolve(&self, target: TypeKey, value: &Value, ctx: Option<&ConversionContext>) -> Outcome {
        let key = ConversionKey::new(value.type_key(), target);
        if key.is_identity() {
            return Outcome::Success(value.clone());
        }

        // Read before the catalog and chain so a concurrent registration
        // leaves anything cached below stale.
        let generation = self.generation.load(Ordering::SeqCst);

        let mut tried: Option<Route> = None;
        if let Some(route) = self.cached_route(&key, generation) {
            match route.run(target, value, ctx, self) {
                out @ Outcome::Success(_) => {
                    self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    trace!(%key, "cached route hit");
                    return out;
                }
                out @ Outcome::Failure(_) => {
                    trace!(%key, "cached route failed");
                    return out;
                }
                Outcome::NotApplicable | Outcome::Indeterminate => {
                    trace!(%key, "cached route declined, searching again");
                    tried = Some(route);
                }
            }
        }

        if let Some(converter) = self.lookup(&key)
            && !tried.as_ref().is_some_and(|r| r.is_direct(&converter))
        {
            match converter(value, ctx, self) {
                out @ Outcome::Success(_) => {
                    self.remember(key, generation, Route::Direct(converter));
                    trace!(%key, "direct converter succeeded");
                    return out;
                }
                out @ Outcome::Failure(_) => return out,
                Outcome::NotApplicable | Outcome::Indeterminate => {
                    trace!(%key, "direct converter declined, walking fallback chain");
                }
            }
        }

        let chain = self.fallbacks.load();
        for entry in chain.iter() {
            if tried.as_ref().is_some_and(|r| r.is_fallback(entry)) {
                continue;
            }
            match entry.resolver().resolve(target, value, ctx, self) {
                Outcome::NotApplicable => continue,
                out @ Outcome::Success(_) => {
                    if entry.is_cacheable() {
                        self.remember(key, generation, Route::Fallback(entry.clone()));
                    }
                    trace!(%key, resolver = entry.resolver().name(), "fallback resolved");
                    return out;
                }
                out => {
                    trace!(%key, resolver = entry.resolver().name(), "fallback short-circuited");
                    return out;
                }
            }
        }

        trace!(%key, "no converter applied");
        Outcome::Indeterminate
    }

    /// The route cached for `key`, if it is still current.
    ///
    /// The route is cloned out so no shard lock is held while it runs.
    fn cached_route(&self, key: &ConversionKey, generation: u64) -> Option<Route> {
        self.cache
            .get(key)
            .filter(|cached| cached.generation == generation)
            .map(|cached| cached.route.clone())
    }

    fn remember(&self, key: ConversionKey, generation: u64, route: Route) {
        if self.generation.load(Ordering::SeqCst) == generation {
            self.cache.insert(key, CachedRoute { generation, route });
        }
    }

    /// Converts `value` into `T`.
    ///
    /// Returns `Ok(None)` when no value could be determined or the
    /// conversion succeeded with an absent value.
    pub fn convert_to<T: Any + Send + Sync>(
        &self,
        value: &Value,
        ctx: Option<&ConversionContext>,
    ) -> ConversionResult<Option<Arc<T>>> {
        match self.convert(TypeKey::of::<T>(), value, ctx).into_result()? {
            None | Some(Value::Absent) => Ok(None),
            Some(produced) => produced.into_arc::<T>().map(Some).map_err(|other| {
                ConversionError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    actual: other.type_key().name(),
                }
            }),
        }
    }

    /// Converts `value` into `T`, treating "no value" as an error.
    pub fn mandatory_convert_to<T: Any + Send + Sync>(
        &self,
        value: &Value,
        ctx: Option<&ConversionContext>,
    ) -> ConversionResult<Arc<T>> {
        self.convert_to::<T>(value, ctx)?.ok_or_else(|| {
            ConversionError::no_converter(ConversionKey::new(value.type_key(), TypeKey::of::<T>()))
        })
    }

    // ------------------------------------------------------------------------
    // Cache & statistics
    // ------------------------------------------------------------------------

    /// Returns `true` if a route is cached for `key`.
    pub fn is_cached(&self, key: &ConversionKey) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        self.cache.get(key).is_some_and(|cached| cached.generation == generation)
    }

    /// Keys with a cached route.
    pub fn cached_keys(&self) -> Vec<ConversionKey> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.cache
            .iter()
            .filter(|e| e.value().generation == generation)
            .map(|e| *e.key())
            .collect()
    }

    /// Drops every cached route.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Returns the current counters.
    pub fn stats(&self) -> ConversionStats {
        let c = &self.counters;
        ConversionStats {
            attempts: c.attempts.load(Ordering::Relaxed),
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            failures: c.failures.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Resets every counter to zero.
    pub fn reset_stats(&self) {
        let c = &self.counters;
        for counter in [&c.attempts, &c.hits, &c.misses, &c.failures, &c.cache_hits] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionRegistry")
            .field("converters", &self.converter_count())
            .field("fallbacks", &self.fallback_names())
            .field("cached", &self.cache.len())
            .finish()
    }
}
