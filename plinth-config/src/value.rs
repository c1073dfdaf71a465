//! The document value shared by every configuration-facing API.

/// A configuration document: null, a scalar, an ordered sequence or a
/// string-keyed mapping. Mappings preserve no key order; comparisons are
/// structural.
pub type ConfigValue = serde_json::Value;

/// Human-readable kind of a [ConfigValue], used in diagnostics.
pub fn kind_of(value: &ConfigValue) -> &'static str {
    match value {
        ConfigValue::Null => "null",
        ConfigValue::Bool(_) => "boolean",
        ConfigValue::Number(_) => "number",
        ConfigValue::String(_) => "string",
        ConfigValue::Array(_) => "sequence",
        ConfigValue::Object(_) => "mapping",
    }
}
