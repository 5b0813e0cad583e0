//! Execution context supplied to converters.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::value::Value;

/// Charset used when the context does not name one.
pub const DEFAULT_CHARSET: &str = "UTF-8";

/// Optional per-call context: a charset, free-form properties, and shared
/// services a converter may need.
#[derive(Clone, Default)]
pub struct ConversionContext {
    charset: Option<String>,
    properties: HashMap<String, Value>,
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ConversionContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the charset used by text-producing converters.
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Returns the configured charset, or [`DEFAULT_CHARSET`].
    pub fn charset(&self) -> &str {
        self.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }

    /// Returns `true` if a charset was set explicitly.
    pub fn has_charset(&self) -> bool {
        self.charset.is_some()
    }

    /// Attaches a named property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns a property by name.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Attaches a shared service, keyed by its type.
    pub fn with_service<T: Any + Send + Sync>(mut self, service: Arc<T>) -> Self {
        self.services.insert(TypeId::of::<T>(), service);
        self
    }

    /// Returns a service previously attached with [`with_service`](Self::with_service).
    pub fn get_service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|s| Arc::clone(s).downcast::<T>().ok())
    }
}

impl std::fmt::Debug for ConversionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionContext")
            .field("charset", &self.charset)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_defaults_to_utf8() {
        assert_eq!(ConversionContext::new().charset(), "UTF-8");
        assert_eq!(ConversionContext::new().with_charset("ISO-8859-1").charset(), "ISO-8859-1");
    }

    #[test]
    fn test_service_lookup_by_type() {
        struct Clock(u64);
        let ctx = ConversionContext::new().with_service(Arc::new(Clock(9)));
        assert_eq!(ctx.get_service::<Clock>().map(|c| c.0), Some(9));
        assert!(ctx.get_service::<String>().is_none());
    }
}
