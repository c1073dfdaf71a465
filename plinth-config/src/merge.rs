//! Deep-merging of ordered configuration sources into a single document.
//!
//! Sources are addressed by file path or HTTP URL and parsed by whichever
//! [ContentParser] is registered for their extension or content type. The
//! merge is left-biased: later sources win on scalar collisions, mappings
//! merge recursively, and sequences overwrite unless array merging is
//! enabled, in which case they accumulate in source order.

use crate::error::MergeError;
use crate::parser::{ContentParser, JsonContentParser, ParserPtr};
use crate::value::ConfigValue;
use fxhash::FxHashMap;
use serde_json::map::Entry;
use serde_json::Map;
use std::fs;
use std::sync::Arc;
use tracing::{debug, trace};

/// Merges an ordered list of configuration sources into one tree.
pub struct DocumentMerger {
    default_parser: ParserPtr,
    parser_by_extension: FxHashMap<String, ParserPtr>,
    parser_by_content_type: FxHashMap<String, ParserPtr>,
    merge_arrays: bool,
}

impl Default for DocumentMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentMerger {
    /// Creates a merger with the JSON parser as the default.
    pub fn new() -> Self {
        Self::with_default_parser(Arc::new(JsonContentParser))
    }

    /// Creates a merger with a caller-supplied default parser. The default
    /// parser is also registered for its own extensions and content types.
    pub fn with_default_parser(parser: ParserPtr) -> Self {
        let mut merger = Self {
            default_parser: parser.clone(),
            parser_by_extension: FxHashMap::default(),
            parser_by_content_type: FxHashMap::default(),
            merge_arrays: false,
        };

        merger.register_content_parser(parser);
        merger
    }

    /// Enables or disables sequence concatenation. Concatenation is rarely
    /// the right default, so it is opt-in.
    pub fn merge_arrays(mut self, merge_arrays: bool) -> Self {
        self.merge_arrays = merge_arrays;
        self
    }

    /// Registers a parser for every extension and content type it claims,
    /// lowercased.
    pub fn register_content_parser(&mut self, parser: ParserPtr) {
        for content_type in parser.content_types() {
            self.parser_by_content_type
                .insert(content_type.to_ascii_lowercase(), parser.clone());
        }

        for extension in parser.extensions() {
            self.parser_by_extension
                .insert(extension.to_ascii_lowercase(), parser.clone());
        }
    }

    /// Loads every source in order and merges them into an initially empty
    /// tree.
    pub fn load_and_merge<S: AsRef<str>>(&self, sources: &[S]) -> Result<ConfigValue, MergeError> {
        self.load_and_merge_with_base(ConfigValue::Object(Map::new()), sources)
    }

    /// Loads every source in order and merges them over `base`. Any
    /// unreadable source, parse failure or non-mapping root aborts the whole
    /// merge.
    pub fn load_and_merge_with_base<S: AsRef<str>>(
        &self,
        base: ConfigValue,
        sources: &[S],
    ) -> Result<ConfigValue, MergeError> {
        let ConfigValue::Object(mut merged) = base else {
            return Err(MergeError::NonMappingRoot {
                origin: "<base document>".to_string(),
            });
        };

        for source in sources {
            let source = source.as_ref();
            let (data, parser) = self.load_source(source)?;

            let parsed = parser.parse(&data).map_err(|cause| MergeError::Parse {
                origin: source.to_string(),
                cause,
            })?;

            let ConfigValue::Object(additional) = parsed else {
                return Err(MergeError::NonMappingRoot {
                    origin: source.to_string(),
                });
            };

            merge_mappings(&mut merged, additional, self.merge_arrays);
        }

        Ok(ConfigValue::Object(merged))
    }

    fn load_source(&self, source: &str) -> Result<(Vec<u8>, ParserPtr), MergeError> {
        if is_url(source) {
            trace!(url = source, "accessing configuration URL");
            return self.load_from_url(source);
        }

        trace!(file = source, "reading configuration file");

        let extension = extract_extension(source);
        let parser = match self.parser_by_extension.get(&extension) {
            Some(parser) => {
                trace!(extension = extension.as_str(), "found content parser for extension");
                parser.clone()
            }
            None => self.default_parser.clone(),
        };

        let data = fs::read(source).map_err(|error| MergeError::SourceUnavailable {
            origin: source.to_string(),
            detail: error.to_string(),
        })?;

        Ok((data, parser))
    }

    fn load_from_url(&self, url: &str) -> Result<(Vec<u8>, ParserPtr), MergeError> {
        let unavailable = |detail: String| MergeError::SourceUnavailable {
            origin: url.to_string(),
            detail,
        };

        let response = reqwest::blocking::get(url).map_err(|error| unavailable(error.to_string()))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(unavailable(format!("HTTP {}", status.as_u16())));
        }

        let parser = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(content_type_token)
            .and_then(|token| {
                self.parser_by_content_type.get(&token).cloned().map(|parser| {
                    debug!(content_type = token.as_str(), "found content parser for response");
                    parser
                })
            })
            .unwrap_or_else(|| self.default_parser.clone());

        let data = response
            .bytes()
            .map_err(|error| unavailable(error.to_string()))?
            .to_vec();

        Ok((data, parser))
    }
}

/// Merges `additional` into `base` in place. Keys absent from `base` are
/// copied; mappings recurse; sequences concatenate when `merge_arrays` is
/// set; everything else overwrites.
pub fn merge_mappings(
    base: &mut Map<String, ConfigValue>,
    additional: Map<String, ConfigValue>,
    merge_arrays: bool,
) {
    for (key, value) in additional {
        match base.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match (slot.get_mut(), value) {
                (ConfigValue::Object(existing), ConfigValue::Object(incoming)) => {
                    merge_mappings(existing, incoming, merge_arrays);
                }
                (ConfigValue::Array(existing), ConfigValue::Array(mut incoming))
                    if merge_arrays =>
                {
                    existing.append(&mut incoming);
                }
                (existing, incoming) => *existing = incoming,
            },
        }
    }
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Lowercased characters after the final `.`, or "" when the path has none.
fn extract_extension(path: &str) -> String {
    path.rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default()
}

/// First `;`-separated token of a content-type header, trimmed and
/// lowercased.
fn content_type_token(header: &str) -> String {
    header
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
