//! Text encodings supported by the text-producing converters.
//!
//! Only the three charsets every integration peer is expected to speak are
//! supported: UTF-8, ISO-8859-1 and US-ASCII.

use std::fmt;
use std::str::FromStr;

use rivet_core::{ConversionContext, ConversionRegistry};

use crate::error::{ConvertError, ConvertResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Iso8859_1 => "ISO-8859-1",
            Self::UsAscii => "US-ASCII",
        }
    }

    /// The charset named by `ctx`, UTF-8 when there is no context.
    pub fn from_context(ctx: Option<&ConversionContext>) -> ConvertResult<Self> {
        ctx.map_or(Ok(Self::Utf8), |c| c.charset().parse())
    }

    pub fn encode(&self, text: &str) -> ConvertResult<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Iso8859_1 => narrow(text, self.name(), 0xFF),
            Self::UsAscii => narrow(text, self.name(), 0x7F),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> ConvertResult<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(|e| ConvertError::Malformed {
                charset: self.name(),
                offset: e.utf8_error().valid_up_to(),
            }),
            Self::Iso8859_1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::UsAscii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(ConvertError::Malformed {
                    charset: self.name(),
                    offset,
                }),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }
}

fn narrow(text: &str, charset: &'static str, max: u32) -> ConvertResult<Vec<u8>> {
    text.chars()
        .map(|ch| match u8::try_from(u32::from(ch)) {
            Ok(b) if u32::from(b) <= max => Ok(b),
            _ => Err(ConvertError::Unmappable { charset, ch }),
        })
        .collect()
}

impl FromStr for Charset {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "UTF-8" | "UTF8" => Ok(Self::Utf8),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Ok(Self::Iso8859_1),
            "US-ASCII" | "ASCII" => Ok(Self::UsAscii),
            _ => Err(ConvertError::UnsupportedCharset { name: s.to_string() }),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_converter(|s: &String, ctx| Charset::from_context(ctx)?.encode(s));
    registry.add_converter(|b: &Vec<u8>, ctx| Charset::from_context(ctx)?.decode(b));
}
