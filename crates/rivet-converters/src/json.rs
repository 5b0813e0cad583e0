//! JSON documents.

use rivet_core::ConversionRegistry;

pub(crate) fn register(registry: &ConversionRegistry) {
    registry.add_converter(|s: &String, _| serde_json::from_str::<serde_json::Value>(s));
    registry.add_converter(|b: &Vec<u8>, _| serde_json::from_slice::<serde_json::Value>(b));
    registry.add_converter(|v: &serde_json::Value, _| serde_json::to_string(v));
}
