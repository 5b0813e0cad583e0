//! Structured messages serialised to text or bytes.
//!
//! A [`StructuredMessage`] knows how to write itself to a byte sink. The
//! converters here serialise it, then decode the bytes with the charset of
//! the conversion context. Values carry messages wrapped in a [`Message`]
//! handle so one converter covers every implementation.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use rivet_core::{BoxError, ConversionRegistry};

use crate::charset::Charset;

/// A message that can serialise itself.
pub trait StructuredMessage: Send + Sync {
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Shared handle to a [`StructuredMessage`].
#[derive(Clone)]
pub struct Message(Arc<dyn StructuredMessage>);

impl Message {
    pub fn new<M: StructuredMessage + 'static>(message: M) -> Self {
        Self(Arc::new(message))
    }

    /// Serialises the message into a byte buffer.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.0.write_to(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Message(..)")
    }
}

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_converter(|m: &Message, _| m.to_bytes());
    registry.add_converter(|m: &Message, ctx| -> Result<String, BoxError> {
        let charset = Charset::from_context(ctx)?;
        let bytes = m.to_bytes()?;
        Ok(charset.decode(&bytes)?)
    });
}
