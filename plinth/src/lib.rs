//! Application bootstrap for the Plinth framework.
//!
//! An [Application](application::Application) takes an ordered list of
//! configuration sources and a set of proto-components, merges the sources
//! over the framework defaults, builds and populates the component container
//! and drives it through lifecycle start. The returned
//! [RunningApplication](application::RunningApplication) offers by-name
//! lookup and an orderly shutdown.
//!
//! Framework behavior lives under the reserved `plinth` key of the merged
//! configuration: the tracing logger toggle, the lifecycle gate parameters
//! and the query manager facility.

pub mod application;
pub mod settings;

pub use application::{Application, ApplicationError, RunningApplication};
pub use plinth_ioc::FRAMEWORK_PREFIX;
