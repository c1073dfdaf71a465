use thiserror::Error;

/// A failure produced by a [ContentParser](crate::parser::ContentParser).
pub type ParseFailure = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while loading and merging configuration sources. Any of
/// these aborts the whole merge; partial merges are never retained.
#[derive(Error, Debug)]
pub enum MergeError {
    /// A source could not be read, either because of filesystem problems or
    /// because a remote URL answered with an error status.
    #[error("configuration source {origin} is unavailable: {detail}")]
    SourceUnavailable { origin: String, detail: String },

    /// A source was read but its bytes could not be parsed as a document.
    #[error("cannot parse configuration source {origin}: {cause}")]
    Parse { origin: String, cause: ParseFailure },

    /// A source parsed cleanly but its root is not a mapping.
    #[error("configuration source {origin} does not have a mapping at its root")]
    NonMappingRoot { origin: String },
}

/// A leaf value could not be coerced into the requested type.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
#[error("expected {expected}, got {got}")]
pub struct CoercionError {
    pub expected: &'static str,
    pub got: String,
}

impl CoercionError {
    pub(crate) fn new(expected: &'static str, value: &crate::value::ConfigValue) -> Self {
        let got = match value {
            crate::value::ConfigValue::String(text) => format!("string {text:?}"),
            other => crate::value::kind_of(other).to_string(),
        };

        Self { expected, got }
    }
}

/// Errors raised when addressing the merged configuration tree.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no value exists at config path {0}")]
    MissingPath(String),

    /// The value at the path exists but has the wrong kind for the target.
    #[error("config value at {path} has the wrong kind: {source}")]
    TypeMismatch {
        path: String,
        #[source]
        source: CoercionError,
    },

    /// A subtree could not be deserialized into the requested record type.
    #[error("cannot populate target from config path {path}: {source}")]
    Populate {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
