//! Core application bootstrap functionality.

use crate::settings::{framework_defaults, FrameworkSettings};
use fxhash::FxHashMap;
use plinth_config::accessor::ConfigAccessor;
use plinth_config::error::{ConfigError, MergeError};
use plinth_config::merge::DocumentMerger;
use plinth_config::parser::YamlContentParser;
use plinth_ioc::component::{Component, ComponentFinderPtr};
use plinth_ioc::container::ComponentContainer;
use plinth_ioc::error::{LifecycleError, PopulateError};
use plinth_ioc::proto::ProtoComponent;
use plinth_ioc::FRAMEWORK_PREFIX;
use plinth_query::query_manager_proto;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{dispatcher, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Error, Debug)]
pub enum ApplicationError {
    /// A configuration source could not be loaded, parsed or merged.
    #[error("problem merging configuration: {0}")]
    Merge(#[from] MergeError),
    /// The framework section of the merged configuration is malformed.
    #[error("problem reading framework settings: {0}")]
    Settings(#[source] ConfigError),
    /// The component graph could not be wired.
    #[error("problem populating the component container: {0}")]
    Populate(#[from] PopulateError),
    /// A lifecycle phase failed during start.
    #[error("problem starting components: {0}")]
    Lifecycle(#[from] LifecycleError),
    /// A panic escaped populate or start. The graph is not repairable;
    /// callers should exit.
    #[error("panic recovered while booting: {0}")]
    BootPanic(String),
}

/// Main entrypoint for a Plinth application. Collects configuration sources,
/// protos and modifiers, then [boots](Self::boot) the container.
#[derive(Default)]
pub struct Application {
    config_sources: Vec<String>,
    protos: Vec<ProtoComponent>,
    modifiers: FxHashMap<String, FxHashMap<String, String>>,
    merge_arrays: bool,
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a configuration source (file path or HTTP URL). Sources merge
    /// in the order given, over the framework defaults.
    pub fn with_config_source(mut self, source: impl Into<String>) -> Self {
        self.config_sources.push(source.into());
        self
    }

    pub fn with_proto(mut self, proto: ProtoComponent) -> Self {
        self.protos.push(proto);
        self
    }

    pub fn with_protos(mut self, protos: Vec<ProtoComponent>) -> Self {
        self.protos.extend(protos);
        self
    }

    /// Re-targets `component.field` to a different dependency during
    /// resolution.
    pub fn with_modifier(
        mut self,
        component: impl Into<String>,
        field: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        self.modifiers
            .entry(component.into())
            .or_default()
            .insert(field.into(), dependency.into());
        self
    }

    /// Enables sequence concatenation when merging configuration sources.
    pub fn merge_arrays(mut self, merge_arrays: bool) -> Self {
        self.merge_arrays = merge_arrays;
        self
    }

    /// Merges configuration, builds and populates the container and starts
    /// every component. Populate and merge failures are fatal; a panic on
    /// the boot path is caught, logged and surfaced as
    /// [ApplicationError::BootPanic].
    pub fn boot(self) -> Result<RunningApplication, ApplicationError> {
        match catch_unwind(AssertUnwindSafe(|| self.boot_inner())) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload);
                error!("panic recovered while booting components: {message}");
                Err(ApplicationError::BootPanic(message))
            }
        }
    }

    fn boot_inner(self) -> Result<RunningApplication, ApplicationError> {
        let mut merger = DocumentMerger::new().merge_arrays(self.merge_arrays);
        merger.register_content_parser(Arc::new(YamlContentParser));

        let merged = merger.load_and_merge_with_base(framework_defaults(), &self.config_sources)?;
        let accessor = ConfigAccessor::new(merged);

        let settings: FrameworkSettings = accessor
            .resolve(FRAMEWORK_PREFIX)
            .map_err(ApplicationError::Settings)?;

        let logger_guard = install_logger(&settings);

        let mut container =
            ComponentContainer::with_settings(accessor, (&settings.container).into());

        if settings.query_manager.enabled {
            info!("enabling query manager facility");
            container.add_proto(query_manager_proto());
        }

        container.add_protos(self.protos);
        container.add_modifiers(self.modifiers);

        container.populate()?;

        info!("starting components");

        if let Err(reason) = container.start_components() {
            error!("start failed, shutting down already-started components");
            container.shutdown_components();
            return Err(reason.into());
        }

        info!("components started");

        Ok(RunningApplication {
            container,
            _logger: logger_guard,
        })
    }
}

/// A booted application: the started container plus the logger installed for
/// its lifetime.
#[derive(Debug)]
pub struct RunningApplication {
    container: ComponentContainer,
    _logger: Option<dispatcher::DefaultGuard>,
}

impl RunningApplication {
    pub fn component_by_name(&self, name: &str) -> Option<Component> {
        self.container.component_by_name(name)
    }

    /// Shared by-name lookup handle, cheap to hand to worker threads.
    pub fn finder(&self) -> ComponentFinderPtr {
        self.container.finder()
    }

    pub fn container(&self) -> &ComponentContainer {
        &self.container
    }

    /// Stops every component. Stop problems are logged, never fatal; this
    /// always runs to completion.
    pub fn shutdown(mut self) {
        info!("stopping components");
        self.container.shutdown_components();
        info!("components stopped");
    }
}

fn install_logger(settings: &FrameworkSettings) -> Option<dispatcher::DefaultGuard> {
    if !settings.logging.install_tracing_logger {
        return None;
    }

    Some(
        tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(fmt::layer())
            .set_default(),
    )
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
