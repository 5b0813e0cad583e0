//! Tagged values exchanged between components.
//!
//! A [`Value`] is built once and tagged with its [`ValueKind`] at construction
//! time. Converters and resolvers branch on that tag instead of probing the
//! payload's type over and over:
//!
//! - [`Value::Absent`]: the absent-value placeholder. A conversion that
//!   succeeds with `Absent` legitimately denotes "nothing".
//! - [`Value::Scalar`]: any `Send + Sync` payload, tagged with its [`TypeKey`].
//! - [`Value::Sequence`]: a sequence-shaped wrapper around other values.
//! - [`Value::Envelope`]: a response-like value carrying one embedded entity.
//!
//! ```rust,ignore
//! let v = Value::new(42_i64);
//! assert_eq!(v.kind(), ValueKind::Scalar);
//! assert_eq!(v.downcast_ref::<i64>(), Some(&42));
//!
//! let seq = Value::from(Sequence::new(vec![Value::Absent, Value::from("hello")]));
//! assert_eq!(seq.kind(), ValueKind::Sequence);
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// ============================================================================
// TypeKey
// ============================================================================

/// Runtime descriptor of a type, used in conversion keys and binding indexes.
///
/// Equality and hashing only consider the [`TypeId`]; the name is kept for
/// logs and error messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Returns the key for `T`.
    pub fn of<T: ?Sized + Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Returns the underlying [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this key describes `T`.
    pub fn is<T: ?Sized + Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Marker type naming the shape of [`Value::Absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Absent;

// ============================================================================
// ValueKind
// ============================================================================

/// Variant tag assigned when a [`Value`] is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// The absent-value placeholder.
    Absent,
    /// A single typed payload.
    Scalar,
    /// A sequence-shaped wrapper.
    Sequence,
    /// A response-like wrapper with one embedded entity.
    Envelope,
}

// ============================================================================
// Scalar
// ============================================================================

/// A type-erased payload together with its [`TypeKey`].
#[derive(Clone)]
pub struct Scalar {
    key: TypeKey,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Scalar {
    /// Wraps an already shared payload.
    pub fn from_arc<T: Any + Send + Sync>(inner: Arc<T>) -> Self {
        Self {
            key: TypeKey::of::<T>(),
            inner,
        }
    }

    /// Returns the payload's type key.
    pub fn type_key(&self) -> TypeKey {
        self.key
    }

    /// Borrows the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Returns a shared handle to the payload as `T`.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast().ok()
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Scalar").field(&self.key).finish()
    }
}

// ============================================================================
// Sequence
// ============================================================================

/// An ordered, immutable list of values.
#[derive(Clone, Default)]
pub struct Sequence {
    items: Arc<[Value]>,
}

impl Sequence {
    /// Creates a sequence from `items`.
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Returns the number of elements, absent ones included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the sequence has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the element at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Iterates over the elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    /// Returns the first element that is not [`Value::Absent`].
    pub fn first_present(&self) -> Option<&Value> {
        self.items.iter().find(|v| !v.is_absent())
    }
}

impl FromIterator<Value> for Sequence {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A response-like value exposing exactly one embedded entity.
#[derive(Clone)]
pub struct Envelope {
    entity: Arc<Value>,
    status: u16,
}

impl Envelope {
    /// Creates an envelope with status `200`.
    pub fn new(entity: Value) -> Self {
        Self {
            entity: Arc::new(entity),
            status: 200,
        }
    }

    /// Creates an envelope whose entity is absent.
    pub fn empty() -> Self {
        Self::new(Value::Absent)
    }

    /// Sets the status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Returns the embedded entity, which may be [`Value::Absent`].
    pub fn entity(&self) -> &Value {
        &self.entity
    }

    /// Returns the status code.
    pub fn status(&self) -> u16 {
        self.status
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("status", &self.status)
            .field("entity", &self.entity)
            .finish()
    }
}

// ============================================================================
// Value
// ============================================================================

/// A value of any declared type, tagged with its [`ValueKind`].
#[derive(Clone, Default)]
pub enum Value {
    /// The absent-value placeholder.
    #[default]
    Absent,
    /// A single typed payload.
    Scalar(Scalar),
    /// A sequence-shaped wrapper.
    Sequence(Sequence),
    /// A response-like wrapper.
    Envelope(Envelope),
}

impl Value {
    /// Wraps `value`, assigning its variant tag.
    ///
    /// Passing a [`Sequence`], [`Envelope`] or [`Value`] yields the matching
    /// variant rather than an opaque scalar, so the tag never lies.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        let mut slot = Some(value);
        let any = &mut slot as &mut dyn Any;
        if let Some(v) = any.downcast_mut::<Option<Value>>() {
            return v.take().unwrap_or_default();
        }
        if let Some(s) = any.downcast_mut::<Option<Sequence>>() {
            return s.take().map_or(Self::Absent, Self::Sequence);
        }
        if let Some(e) = any.downcast_mut::<Option<Envelope>>() {
            return e.take().map_or(Self::Absent, Self::Envelope);
        }
        slot.map_or(Self::Absent, |v| Self::Scalar(Scalar::from_arc(Arc::new(v))))
    }

    /// Wraps an already shared payload as a scalar.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self::Scalar(Scalar::from_arc(value))
    }

    /// Returns the variant tag.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Absent => ValueKind::Absent,
            Self::Scalar(_) => ValueKind::Scalar,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Envelope(_) => ValueKind::Envelope,
        }
    }

    /// Returns the runtime shape used as the source half of a conversion key.
    pub fn type_key(&self) -> TypeKey {
        match self {
            Self::Absent => TypeKey::of::<Absent>(),
            Self::Scalar(s) => s.type_key(),
            Self::Sequence(_) => TypeKey::of::<Sequence>(),
            Self::Envelope(_) => TypeKey::of::<Envelope>(),
        }
    }

    /// Returns `true` for the absent-value placeholder.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Borrows the payload as `T`.
    ///
    /// Works for every variant: a sequence is a `Sequence`, an envelope is an
    /// `Envelope`, an absent value is `Absent`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Absent => (&Absent as &dyn Any).downcast_ref(),
            Self::Scalar(s) => s.downcast_ref(),
            Self::Sequence(s) => (s as &dyn Any).downcast_ref(),
            Self::Envelope(e) => (e as &dyn Any).downcast_ref(),
        }
    }

    /// Returns a shared handle to a scalar payload.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Scalar(s) => s.downcast_arc(),
            _ => None,
        }
    }

    /// Consumes the value and returns its payload as a shared `T`.
    ///
    /// Sequences and envelopes can be taken out as themselves. On a type
    /// mismatch the value is handed back unchanged.
    pub fn into_arc<T: Any + Send + Sync>(self) -> Result<Arc<T>, Value> {
        match self {
            Self::Scalar(s) => match Arc::clone(&s.inner).downcast::<T>() {
                Ok(v) => Ok(v),
                Err(_) => Err(Self::Scalar(s)),
            },
            Self::Sequence(s) => {
                let boxed: Box<dyn Any + Send + Sync> = Box::new(s);
                boxed
                    .downcast::<T>()
                    .map(Arc::from)
                    .map_err(|b| b.downcast::<Sequence>().map_or(Self::Absent, |s| Self::Sequence(*s)))
            }
            Self::Envelope(e) => {
                let boxed: Box<dyn Any + Send + Sync> = Box::new(e);
                boxed
                    .downcast::<T>()
                    .map(Arc::from)
                    .map_err(|b| b.downcast::<Envelope>().map_or(Self::Absent, |e| Self::Envelope(*e)))
            }
            Self::Absent => Err(Self::Absent),
        }
    }

    /// Returns `true` if the payload is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_key().is::<T>()
    }

    /// Returns the sequence when this is [`Value::Sequence`].
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the envelope when this is [`Value::Envelope`].
    pub fn as_envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Envelope(e) => Some(e),
            _ => None,
        }
    }

    /// Borrows a `String` payload as `&str`.
    pub fn as_str(&self) -> Option<&str> {
        self.downcast_ref::<String>().map(String::as_str)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("Absent"),
            Self::Scalar(s) => match s.downcast_ref::<String>() {
                Some(text) => f.debug_tuple("Scalar").field(text).finish(),
                None => fmt::Debug::fmt(s, f),
            },
            Self::Sequence(s) => f.debug_tuple("Sequence").field(s).finish(),
            Self::Envelope(e) => fmt::Debug::fmt(e, f),
        }
    }
}

impl From<Sequence> for Value {
    fn from(value: Sequence) -> Self {
        Self::Sequence(value)
    }
}

impl From<Envelope> for Value {
    fn from(value: Envelope) -> Self {
        Self::Envelope(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}
