//! Layered configuration for the Plinth framework.
//!
//! Configuration is expressed as an ordered list of structured documents
//! (files or HTTP resources) which are deep-merged into a single tree. Later
//! sources win on scalar collisions, mappings merge key-wise, and sequences
//! either overwrite or concatenate depending on the
//! [merge_arrays](merge::DocumentMerger::merge_arrays) policy. The merged tree
//! is then consulted through a [ConfigAccessor](accessor::ConfigAccessor),
//! which addresses values by dotted path and coerces leaves into typed targets.
//!
//! ### Merging two documents
//!
//! ```
//! use plinth_config::merge::merge_mappings;
//! use serde_json::json;
//!
//! let mut base = json!({"a": 1, "b": {"c": 2}});
//! let additional = json!({"b": {"d": 3}, "e": 4});
//!
//! let base_map = base.as_object_mut().unwrap();
//! let additional_map = additional.as_object().unwrap().clone();
//! merge_mappings(base_map, additional_map, false);
//!
//! assert_eq!(base, json!({"a": 1, "b": {"c": 2, "d": 3}, "e": 4}));
//! ```

pub mod accessor;
pub mod coerce;
pub mod error;
pub mod merge;
pub mod parser;
pub mod value;

pub use accessor::ConfigAccessor;
pub use coerce::FromConfig;
pub use error::{ConfigError, CoercionError, MergeError};
pub use value::ConfigValue;
