//! The component container: owns the object graph, resolves dependencies,
//! applies configuration promises, runs decorators and drives the lifecycle.

use crate::component::{
    Component, ComponentByNameFinder, ComponentFinderPtr, ComponentInstance, Decorator,
};
use crate::error::{LifecycleError, PopulateError};
use crate::lifecycle::{self, LifecycleSettings};
use crate::proto::ProtoComponent;
use fxhash::FxHashMap;
use itertools::Itertools;
use plinth_config::accessor::ConfigAccessor;
use std::sync::Arc;
use tracing::{debug, error, trace};

const CONTAINER_DECORATOR_NAME: &str = "plinthContainerDecorator";

/// Immutable snapshot of the populated graph. Shared with decorators and
/// container-aware components, and safe for concurrent lookup.
#[derive(Default, Debug)]
pub struct ComponentLookup {
    components: FxHashMap<String, Component>,
}

impl ComponentLookup {
    fn new(components: FxHashMap<String, Component>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &FxHashMap<String, Component> {
        &self.components
    }
}

impl ComponentByNameFinder for ComponentLookup {
    fn component_by_name(&self, name: &str) -> Option<Component> {
        self.components.get(name).cloned()
    }
}

/// Owns every component: installs protos, wires the graph and takes it
/// through the lifecycle phases.
///
/// Populate and the two lifecycle transitions take `&mut self` and must not
/// be interleaved; lookups take `&self` and are safe for concurrent use once
/// [populate](Self::populate) has returned.
#[derive(Debug)]
pub struct ComponentContainer {
    components: Arc<ComponentLookup>,
    proto_components: FxHashMap<String, ProtoComponent>,
    registration_order: Vec<String>,
    modifiers: FxHashMap<String, FxHashMap<String, String>>,
    config_accessor: Option<ConfigAccessor>,
    startable: Vec<Component>,
    stoppable: Vec<Component>,
    blocker: Vec<Component>,
    accessible: Vec<Component>,
    settings: LifecycleSettings,
}

impl ComponentContainer {
    pub fn new(config_accessor: ConfigAccessor) -> Self {
        Self::with_settings(config_accessor, LifecycleSettings::default())
    }

    pub fn with_settings(config_accessor: ConfigAccessor, settings: LifecycleSettings) -> Self {
        Self {
            components: Arc::new(ComponentLookup::default()),
            proto_components: FxHashMap::default(),
            registration_order: Vec::new(),
            modifiers: FxHashMap::default(),
            config_accessor: Some(config_accessor),
            startable: Vec::new(),
            stoppable: Vec::new(),
            blocker: Vec::new(),
            accessible: Vec::new(),
            settings,
        }
    }

    /// Registers a proto. A proto with an already-registered name replaces
    /// the earlier one.
    pub fn add_proto(&mut self, proto: ProtoComponent) {
        let name = proto.name().to_string();

        trace!(component = name.as_str(), "adding proto");

        if self.proto_components.insert(name.clone(), proto).is_some() {
            debug!(component = name.as_str(), "replaced existing proto");
        } else {
            self.registration_order.push(name);
        }
    }

    pub fn add_protos(&mut self, protos: Vec<ProtoComponent>) {
        for proto in protos {
            self.add_proto(proto);
        }
    }

    /// Registers an instance with no declarative wiring.
    pub fn wrap_and_add<T: ComponentInstance>(&mut self, name: impl Into<String>, instance: T) {
        self.add_proto(ProtoComponent::new(name, instance));
    }

    /// Re-targets `component.field` to a different dependency, overriding
    /// whatever the proto declared.
    pub fn add_modifier(
        &mut self,
        component: impl Into<String>,
        field: impl Into<String>,
        dependency: impl Into<String>,
    ) {
        self.modifiers
            .entry(component.into())
            .or_default()
            .insert(field.into(), dependency.into());
    }

    pub fn add_modifiers(&mut self, modifiers: FxHashMap<String, FxHashMap<String, String>>) {
        for (component, fields) in modifiers {
            for (field, dependency) in fields {
                self.add_modifier(component.clone(), field, dependency);
            }
        }
    }

    pub fn modifier_exists(&self, component: &str, field: &str) -> bool {
        self.modifiers
            .get(component)
            .is_some_and(|fields| fields.contains_key(field))
    }

    pub fn modifiers_exist(&self, component: &str) -> bool {
        self.modifiers.contains_key(component)
    }

    pub fn modifiers(&self, component: &str) -> Option<&FxHashMap<String, String>> {
        self.modifiers.get(component)
    }

    pub fn component_by_name(&self, name: &str) -> Option<Component> {
        self.components.component_by_name(name)
    }

    pub fn all_components(&self) -> &FxHashMap<String, Component> {
        self.components.components()
    }

    /// Shared by-name lookup handle for running components.
    pub fn finder(&self) -> ComponentFinderPtr {
        self.components.clone()
    }

    /// Turns the proto catalogue into the live graph: installs components,
    /// resolves dependencies (with modifier overrides), applies config
    /// promises, names namers and runs decorators. The catalogue is released
    /// afterwards.
    pub fn populate(&mut self) -> Result<(), PopulateError> {
        let protos = std::mem::take(&mut self.proto_components);
        let order = std::mem::take(&mut self.registration_order);

        let mut components: FxHashMap<String, Component> = FxHashMap::default();
        let mut decorators: Vec<Component> = vec![Component::new(
            CONTAINER_DECORATOR_NAME,
            Arc::new(ContainerDecorator),
        )];

        for name in &order {
            let Some(proto) = protos.get(name) else {
                continue;
            };

            let component = proto.component.clone();

            let declares_wiring =
                !proto.dependencies.is_empty() || !proto.config_promises.is_empty();
            if declares_wiring && component.instance.as_wirable().is_none() {
                return Err(PopulateError::NotWirable {
                    component: name.clone(),
                });
            }

            self.install(&component, &mut decorators);
            components.insert(name.clone(), component);
        }

        self.resolve_dependencies_and_config(&protos, &order, &components)?;

        for decorator in &decorators {
            components.remove(&decorator.name);
        }

        let lookup = Arc::new(ComponentLookup::new(components));
        self.decorate_components(&lookup, &decorators);
        self.components = lookup;

        Ok(())
    }

    fn install(&mut self, component: &Component, decorators: &mut Vec<Component>) {
        if let Some(namer) = component.instance.as_namer() {
            namer.set_component_name(&component.name);
        }

        if component.instance.as_decorator().is_some() {
            trace!("found decorator {}", component.name);
            decorators.push(component.clone());
            // scaffolding: decorators take no part in the lifecycle
            return;
        }

        if component.instance.as_startable().is_some() {
            trace!("{} is startable", component.name);
            self.startable.push(component.clone());
        }

        if component.instance.as_stoppable().is_some() {
            trace!("{} is stoppable", component.name);
            self.stoppable.push(component.clone());
        }

        if component.instance.as_blocker().is_some() {
            trace!("{} is an accessibility blocker", component.name);
            self.blocker.push(component.clone());
        }

        if component.instance.as_accessible().is_some() {
            trace!("{} is accessible", component.name);
            self.accessible.push(component.clone());
        }
    }

    fn resolve_dependencies_and_config(
        &self,
        protos: &FxHashMap<String, ProtoComponent>,
        order: &[String],
        components: &FxHashMap<String, Component>,
    ) -> Result<(), PopulateError> {
        for name in order {
            let Some(proto) = protos.get(name) else {
                continue;
            };

            let target = &proto.component;
            let effective = self.merge_dependencies(name, &proto.dependencies);

            for (field, dependency) in effective.iter().sorted() {
                trace!("{} needs {}", name, dependency);

                let Some(required) = components.get(dependency) else {
                    return Err(PopulateError::MissingDependency {
                        component: name.clone(),
                        field: field.clone(),
                        dependency: dependency.clone(),
                    });
                };

                let wirable =
                    target
                        .instance
                        .as_wirable()
                        .ok_or_else(|| PopulateError::NotWirable {
                            component: name.clone(),
                        })?;

                wirable
                    .set_dependency(field, required.instance.clone())
                    .map_err(|source| PopulateError::Injection {
                        component: name.clone(),
                        field: field.clone(),
                        dependency: dependency.clone(),
                        source,
                    })?;
            }

            for (field, path) in proto.config_promises.iter().sorted() {
                trace!("{} wants config from {}", name, path);

                let accessor = self
                    .config_accessor
                    .as_ref()
                    .ok_or(PopulateError::AccessorReleased)?;

                let Some(value) = accessor.value_at(path) else {
                    return Err(PopulateError::MissingConfigPath {
                        component: name.clone(),
                        field: field.clone(),
                        path: path.clone(),
                    });
                };

                let wirable =
                    target
                        .instance
                        .as_wirable()
                        .ok_or_else(|| PopulateError::NotWirable {
                            component: name.clone(),
                        })?;

                wirable
                    .set_config(field, value)
                    .map_err(|source| PopulateError::ConfigPromise {
                        component: name.clone(),
                        field: field.clone(),
                        path: path.clone(),
                        source,
                    })?;
            }
        }

        Ok(())
    }

    /// Combines proto-declared dependencies with registered modifiers;
    /// modifier entries override.
    fn merge_dependencies(
        &self,
        component: &str,
        declared: &FxHashMap<String, String>,
    ) -> FxHashMap<String, String> {
        let mut merged = declared.clone();

        if let Some(overrides) = self.modifiers.get(component) {
            for (field, dependency) in overrides {
                merged.insert(field.clone(), dependency.clone());
            }
        }

        merged
    }

    fn decorate_components(&self, lookup: &Arc<ComponentLookup>, decorators: &[Component]) {
        let finder: ComponentFinderPtr = lookup.clone();

        for component in lookup.components().values() {
            for decorator_component in decorators {
                let Some(decorator) = decorator_component.instance.as_decorator() else {
                    continue;
                };

                if decorator.of_interest(component) {
                    trace!(
                        "decorating {} with {}",
                        component.name,
                        decorator_component.name
                    );
                    decorator.decorate_component(component, &finder);
                }
            }
        }
    }

    /// Runs the start phases: every startable, then the block gate, then
    /// every accessible. On success the startable list and the config
    /// accessor are released. On failure, already-started components are
    /// left running for the caller's shutdown path.
    pub fn start_components(&mut self) -> Result<(), LifecycleError> {
        for component in &self.startable {
            let Some(startable) = component.instance.as_startable() else {
                continue;
            };

            debug!("starting {}", component.name);

            startable
                .start_component()
                .map_err(|reason| LifecycleError::StartFailure {
                    component: component.name.clone(),
                    reason,
                })?;
        }

        if !self.blocker.is_empty() {
            lifecycle::wait_for_blockers(&self.blocker, &self.settings.block_gate)?;
        }

        for component in &self.accessible {
            let Some(accessible) = component.instance.as_accessible() else {
                continue;
            };

            accessible
                .allow_access()
                .map_err(|reason| LifecycleError::AccessFailure {
                    component: component.name.clone(),
                    reason,
                })?;
        }

        self.startable = Vec::new();
        self.config_accessor = None;

        Ok(())
    }

    /// Runs the stop phases: prepare every stoppable, wait on the ready
    /// gate, then stop. Stop errors are logged and suppressed; shutdown
    /// always runs to completion.
    pub fn shutdown_components(&mut self) {
        for component in &self.stoppable {
            if let Some(stoppable) = component.instance.as_stoppable() {
                stoppable.prepare_to_stop();
            }
        }

        lifecycle::wait_until_ready_to_stop(&self.stoppable, &self.settings.ready_gate);

        for component in &self.stoppable {
            let Some(stoppable) = component.instance.as_stoppable() else {
                continue;
            };

            if let Err(reason) = stoppable.stop() {
                error!("{} did not stop cleanly: {}", component.name, reason);
            }
        }
    }
}

/// Built-in decorator handing a by-name lookup to components that ask for
/// one, so peers can be discovered at runtime without a container singleton.
struct ContainerDecorator;

impl ComponentInstance for ContainerDecorator {
    fn as_decorator(&self) -> Option<&dyn Decorator> {
        Some(self)
    }
}

impl Decorator for ContainerDecorator {
    fn of_interest(&self, component: &Component) -> bool {
        component.instance.as_container_aware().is_some()
    }

    fn decorate_component(&self, component: &Component, finder: &ComponentFinderPtr) {
        if let Some(aware) = component.instance.as_container_aware() {
            aware.set_component_finder(finder.clone());
        }
    }
}
