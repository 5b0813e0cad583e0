//! Qualified names in `{namespace}local` syntax.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use rivet_core::ConversionRegistry;

use crate::error::ConvertError;

/// An XML-style qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QualifiedName {
    namespace: String,
    local: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// A name without a namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self::new("", local)
    }

    /// The namespace URI, empty when there is none.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn local_part(&self) -> &str {
        &self.local
    }
}

impl FromStr for QualifiedName {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConvertError::InvalidQualifiedName { input: s.to_string() };
        match s.strip_prefix('{') {
            None => Ok(Self::local(s)),
            Some(rest) => {
                let (namespace, local) = rest.split_once('}').ok_or_else(invalid)?;
                if local.is_empty() {
                    return Err(invalid());
                }
                Ok(Self::new(namespace, local))
            }
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_converter(|s: &String, _| s.parse::<QualifiedName>());
    registry.add_converter(|q: &QualifiedName, _| Ok::<_, Infallible>(q.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_namespaced_and_local() {
        let q: QualifiedName = "{http://example.com/ns}order".parse().unwrap();
        assert_eq!(q.namespace(), "http://example.com/ns");
        assert_eq!(q.local_part(), "order");
        assert_eq!(q.to_string(), "{http://example.com/ns}order");

        let plain: QualifiedName = "order".parse().unwrap();
        assert_eq!(plain, QualifiedName::local("order"));
        assert_eq!(plain.to_string(), "order");
    }

    #[test]
    fn test_unterminated_namespace_is_rejected() {
        assert!(matches!(
            "{http://example.com".parse::<QualifiedName>(),
            Err(ConvertError::InvalidQualifiedName { .. })
        ));
        assert!("{ns}".parse::<QualifiedName>().is_err());
    }
}
