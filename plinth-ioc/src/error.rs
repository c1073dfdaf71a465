use crate::component::ErrorPtr;
use plinth_config::error::CoercionError;
use thiserror::Error;

/// Errors raised by a component rejecting a wiring attempt.
#[derive(Error, Debug)]
pub enum WiringError {
    #[error("no wirable field named {0}")]
    UnknownField(String),

    #[error("dependency is not of the expected type {expected}")]
    IncompatibleDependency { expected: &'static str },

    #[error("value has already been wired")]
    AlreadyWired,

    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// Errors raised while populating the container. All of them are fatal to
/// boot: the graph is not in a repairable state.
#[derive(Error, Debug)]
pub enum PopulateError {
    /// The proto declares dependencies or config promises but its instance
    /// does not answer the [Wirable](crate::component::Wirable) probe.
    #[error("component {component} declares wiring but its instance is not wirable")]
    NotWirable { component: String },

    #[error("no component named {dependency} available (required by {component}.{field})")]
    MissingDependency {
        component: String,
        field: String,
        dependency: String,
    },

    #[error("problem injecting dependency {dependency} into {component}.{field}: {source}")]
    Injection {
        component: String,
        field: String,
        dependency: String,
        #[source]
        source: WiringError,
    },

    #[error("config promise {component}.{field} names missing path {path}")]
    MissingConfigPath {
        component: String,
        field: String,
        path: String,
    },

    #[error("problem applying config path {path} to {component}.{field}: {source}")]
    ConfigPromise {
        component: String,
        field: String,
        path: String,
        #[source]
        source: WiringError,
    },

    /// Populate ran after the config accessor was released by a successful
    /// start.
    #[error("config accessor has been released; populate must run before start")]
    AccessorReleased,
}

/// Errors raised while driving the component lifecycle.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("unable to start {component}: {reason}")]
    StartFailure { component: String, reason: ErrorPtr },

    /// The block gate was exhausted with the named components still blocking.
    #[error("startup blocked by {0:?}")]
    StartupBlocked(Vec<String>),

    #[error("unable to allow access to {component}: {reason}")]
    AccessFailure { component: String, reason: ErrorPtr },
}
