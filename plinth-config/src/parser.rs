//! Content parsers turn raw source bytes into document values. The merger
//! selects a parser by filename extension or HTTP content type, falling back
//! to its default parser when nothing matches.

use crate::error::ParseFailure;
use crate::value::ConfigValue;
use std::sync::Arc;

/// Shared handle to a registered parser.
pub type ParserPtr = Arc<dyn ContentParser + Send + Sync>;

/// Converts a byte buffer of some structured file type into a [ConfigValue].
pub trait ContentParser {
    fn parse(&self, data: &[u8]) -> Result<ConfigValue, ParseFailure>;

    /// Filename extensions (without the dot) this parser handles.
    fn extensions(&self) -> &[&str];

    /// HTTP content types this parser handles.
    fn content_types(&self) -> &[&str];
}

/// The default parser: JSON documents.
pub struct JsonContentParser;

impl ContentParser for JsonContentParser {
    fn parse(&self, data: &[u8]) -> Result<ConfigValue, ParseFailure> {
        serde_json::from_slice(data).map_err(Into::into)
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn content_types(&self) -> &[&str] {
        &[
            "application/json",
            "application/x-javascript",
            "text/javascript",
            "text/x-javascript",
            "text/x-json",
        ]
    }
}

/// YAML documents. Mappings must be string-keyed to be representable as a
/// [ConfigValue].
pub struct YamlContentParser;

impl ContentParser for YamlContentParser {
    fn parse(&self, data: &[u8]) -> Result<ConfigValue, ParseFailure> {
        serde_yaml::from_slice(data).map_err(Into::into)
    }

    fn extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }

    fn content_types(&self) -> &[&str] {
        &["application/yaml", "application/x-yaml", "text/yaml"]
    }
}
