//! Typed access into a merged configuration tree by dotted path.

use crate::coerce::FromConfig;
use crate::error::ConfigError;
use crate::value::ConfigValue;
use serde::de::DeserializeOwned;
use serde_json::Map;

/// Read-only view over the merged configuration tree. The tree is immutable
/// once the accessor owns it; every lookup hands out borrowed values.
#[derive(Debug)]
pub struct ConfigAccessor {
    root: ConfigValue,
}

impl Default for ConfigAccessor {
    fn default() -> Self {
        Self::new(ConfigValue::Object(Map::new()))
    }
}

impl ConfigAccessor {
    pub fn new(root: ConfigValue) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &ConfigValue {
        &self.root
    }

    /// True when a dotted path leads to a value in the tree.
    pub fn path_exists(&self, path: &str) -> bool {
        self.value_at(path).is_some()
    }

    /// Walks a dotted path through the tree. The empty path addresses the
    /// root.
    pub fn value_at(&self, path: &str) -> Option<&ConfigValue> {
        if path.is_empty() {
            return Some(&self.root);
        }

        let mut current = &self.root;

        for part in path.split('.') {
            current = current.as_object()?.get(part)?;
        }

        Some(current)
    }

    /// Fetches the leaf at `path` coerced into `T`.
    pub fn get<T: FromConfig>(&self, path: &str) -> Result<T, ConfigError> {
        let value = self
            .value_at(path)
            .ok_or_else(|| ConfigError::MissingPath(path.to_string()))?;

        T::from_config(value).map_err(|source| ConfigError::TypeMismatch {
            path: path.to_string(),
            source,
        })
    }

    /// Populates a whole record from the subtree at `path`. Fields absent
    /// from the subtree fall back to the record's serde defaults.
    pub fn resolve<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConfigError> {
        let value = self
            .value_at(path)
            .ok_or_else(|| ConfigError::MissingPath(path.to_string()))?;

        serde_json::from_value(value.clone()).map_err(|source| ConfigError::Populate {
            path: path.to_string(),
            source,
        })
    }
}
