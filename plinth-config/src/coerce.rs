//! Coercion of document leaves into typed Rust values.
//!
//! Numeric leaves widen freely (with range checks), string leaves parse into
//! numbers and booleans only when the parse is exact, sequences populate
//! vectors and mappings populate string-keyed maps.

use crate::error::CoercionError;
use crate::value::ConfigValue;
use fxhash::FxHashMap;

/// A value that can be produced from a configuration leaf.
pub trait FromConfig: Sized {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError>;
}

impl FromConfig for ConfigValue {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        Ok(value.clone())
    }
}

impl FromConfig for String {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        match value {
            ConfigValue::String(text) => Ok(text.clone()),
            other => Err(CoercionError::new("string", other)),
        }
    }
}

impl FromConfig for bool {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        match value {
            ConfigValue::Bool(flag) => Ok(*flag),
            ConfigValue::String(text) => text
                .parse()
                .map_err(|_| CoercionError::new("bool", value)),
            other => Err(CoercionError::new("bool", other)),
        }
    }
}

macro_rules! integer_from_config {
    ($($target:ty),*) => {$(
        impl FromConfig for $target {
            fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
                match value {
                    ConfigValue::Number(number) => number
                        .as_i64()
                        .and_then(|wide| <$target>::try_from(wide).ok())
                        .or_else(|| number.as_u64().and_then(|wide| <$target>::try_from(wide).ok()))
                        .ok_or_else(|| CoercionError::new(stringify!($target), value)),
                    ConfigValue::String(text) => text
                        .parse()
                        .map_err(|_| CoercionError::new(stringify!($target), value)),
                    other => Err(CoercionError::new(stringify!($target), other)),
                }
            }
        }
    )*};
}

integer_from_config!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromConfig for f64 {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        match value {
            ConfigValue::Number(number) => number
                .as_f64()
                .ok_or_else(|| CoercionError::new("f64", value)),
            ConfigValue::String(text) => text
                .parse()
                .map_err(|_| CoercionError::new("f64", value)),
            other => Err(CoercionError::new("f64", other)),
        }
    }
}

impl FromConfig for f32 {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        f64::from_config(value).map(|wide| wide as f32)
    }
}

impl<T: FromConfig> FromConfig for Option<T> {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        match value {
            ConfigValue::Null => Ok(None),
            present => T::from_config(present).map(Some),
        }
    }
}

impl<T: FromConfig> FromConfig for Vec<T> {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        match value {
            ConfigValue::Array(elements) => elements.iter().map(T::from_config).collect(),
            other => Err(CoercionError::new("sequence", other)),
        }
    }
}

impl<T: FromConfig> FromConfig for FxHashMap<String, T> {
    fn from_config(value: &ConfigValue) -> Result<Self, CoercionError> {
        match value {
            ConfigValue::Object(entries) => entries
                .iter()
                .map(|(key, entry)| T::from_config(entry).map(|parsed| (key.clone(), parsed)))
                .collect(),
            other => Err(CoercionError::new("mapping", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_widen_numbers_into_any_integer() {
        assert_eq!(i64::from_config(&json!(42)).unwrap(), 42);
        assert_eq!(i8::from_config(&json!(42)).unwrap(), 42);
        assert_eq!(u32::from_config(&json!(42)).unwrap(), 42);
        assert_eq!(u64::from_config(&json!(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(f64::from_config(&json!(42)).unwrap(), 42.0);
    }

    #[test]
    fn should_reject_out_of_range_numbers() {
        assert!(i8::from_config(&json!(300)).is_err());
        assert!(u8::from_config(&json!(-1)).is_err());
    }

    #[test]
    fn should_parse_exact_strings_only() {
        assert_eq!(i64::from_config(&json!("42")).unwrap(), 42);
        assert_eq!(bool::from_config(&json!("true")).unwrap(), true);
        assert!(i64::from_config(&json!("42x")).is_err());
        assert!(i64::from_config(&json!(" 42")).is_err());
        assert!(bool::from_config(&json!("yes")).is_err());
    }

    #[test]
    fn should_not_coerce_numbers_into_strings() {
        let error = String::from_config(&json!(42)).unwrap_err();
        assert_eq!(error.expected, "string");
        assert_eq!(error.got, "number");
    }

    #[test]
    fn should_populate_sequences_and_mappings() {
        let sequence: Vec<i64> = Vec::from_config(&json!([1, 2, 3])).unwrap();
        assert_eq!(sequence, vec![1, 2, 3]);

        let mapping: FxHashMap<String, bool> =
            FxHashMap::from_config(&json!({"a": true, "b": false})).unwrap();
        assert_eq!(mapping.get("a"), Some(&true));
        assert_eq!(mapping.get("b"), Some(&false));
    }

    #[test]
    fn should_treat_null_as_absent_option() {
        let missing: Option<String> = Option::from_config(&ConfigValue::Null).unwrap();
        assert_eq!(missing, None);

        let present: Option<String> = Option::from_config(&json!("x")).unwrap();
        assert_eq!(present.as_deref(), Some("x"));
    }
}
