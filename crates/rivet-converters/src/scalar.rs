//! Numbers and booleans to and from text.

use std::convert::Infallible;

use rivet_core::ConversionRegistry;

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_converter(|s: &String, _| s.trim().parse::<i64>());
    registry.add_converter(|s: &String, _| s.trim().parse::<f64>());
    registry.add_converter(|s: &String, _| s.trim().to_ascii_lowercase().parse::<bool>());

    registry.add_converter(|n: &i64, _| Ok::<_, Infallible>(n.to_string()));
    registry.add_converter(|n: &f64, _| Ok::<_, Infallible>(n.to_string()));
    registry.add_converter(|b: &bool, _| Ok::<_, Infallible>(b.to_string()));
    registry.add_converter(|n: &i64, _| Ok::<_, Infallible>(*n as f64));
}

#[cfg(test)]
mod tests {
    use rivet_core::Value;

    use super::*;

    #[test]
    fn test_parse_trims_and_ignores_bool_case() {
        let registry = ConversionRegistry::new();
        register(&registry);

        assert_eq!(registry.convert_to::<i64>(&Value::from(" 12 "), None).unwrap().as_deref(), Some(&12));
        assert_eq!(registry.convert_to::<f64>(&Value::from("2.5"), None).unwrap().as_deref(), Some(&2.5));
        assert_eq!(registry.convert_to::<bool>(&Value::from("TRUE"), None).unwrap().as_deref(), Some(&true));
        assert!(registry.convert_to::<i64>(&Value::from("twelve"), None).is_err());
    }

    #[test]
    fn test_render_to_text() {
        let registry = ConversionRegistry::new();
        register(&registry);

        let text = registry.convert_to::<String>(&Value::from(-3_i64), None).unwrap();
        assert_eq!(text.as_deref().map(String::as_str), Some("-3"));
        let text = registry.convert_to::<String>(&Value::from(false), None).unwrap();
        assert_eq!(text.as_deref().map(String::as_str), Some("false"));
    }
}
