use thiserror::Error;

/// Errors surfaced verbatim to callers expanding queries.
#[derive(Error, Clone, Eq, PartialEq, Debug)]
pub enum QueryError {
    #[error("unknown query {0}")]
    UnknownQuery(String),

    #[error("query {query} requires a parameter named {parameter} but none was supplied")]
    MissingParameter { query: String, parameter: String },

    #[error("value for parameter {parameter} is not a supported type ({kind})")]
    UnsupportedParamType {
        parameter: String,
        kind: &'static str,
    },
}
