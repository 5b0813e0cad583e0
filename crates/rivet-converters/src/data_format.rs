//! Payload data formats.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rivet_core::ConversionRegistry;

use crate::error::ConvertError;

/// How an endpoint exposes message payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// Typed objects.
    Pojo,
    /// The message body only.
    Payload,
    /// The raw stream.
    Raw,
    /// The full structured message.
    CxfMessage,
}

impl DataFormat {
    pub const ALL: [DataFormat; 4] = [Self::Pojo, Self::Payload, Self::Raw, Self::CxfMessage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pojo => "POJO",
            Self::Payload => "PAYLOAD",
            Self::Raw => "RAW",
            Self::CxfMessage => "CXF_MESSAGE",
        }
    }
}

impl FromStr for DataFormat {
    type Err = ConvertError;

    /// Parses a format name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| ConvertError::UnknownDataFormat { name: s.to_string() })
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_converter(|s: &String, _| s.parse::<DataFormat>());
    registry.add_converter(|f: &DataFormat, _| Ok::<_, Infallible>(f.as_str().to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ignores_case() {
        assert_eq!("payload".parse::<DataFormat>().unwrap(), DataFormat::Payload);
        assert_eq!("Cxf_Message".parse::<DataFormat>().unwrap(), DataFormat::CxfMessage);
        assert!(matches!(
            "soap".parse::<DataFormat>(),
            Err(ConvertError::UnknownDataFormat { ref name }) if name == "soap"
        ));
    }
}
