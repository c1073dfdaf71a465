//! Query template engine facility.
//!
//! Plain-text files in a configured directory hold many templates each: a
//! line starting with the id marker (default `ID:`) begins a new template,
//! blank lines are skipped, and every other line is body text whose variable
//! references (default `${name}`) become substitution points. Calling
//! [QueryManager::build_query_from_id](manager::QueryManager::build_query_from_id)
//! walks the tokenised template and emits the final string, coercing supplied
//! parameters into text.
//!
//! The manager is an ordinary framework component: its settings arrive as
//! config promises and template files load when the container starts it.

pub mod error;
pub mod manager;
pub mod template;

pub use error::QueryError;
pub use manager::{
    query_manager_proto, QueryManager, QueryParams, TemplatedQueryManager,
    QUERY_MANAGER_COMPONENT,
};
