//! The component model: instances, capability probing and wiring.
//!
//! A component is a named, shared instance owned by the container. The
//! container discovers what an instance can do by probing the `as_*`
//! accessors on [ComponentInstance]; an instance advertises a capability by
//! overriding the matching accessor to return itself. This replaces ambient
//! downcasting with an explicit, cheap probe.

use crate::error::WiringError;
use plinth_config::coerce::FromConfig;
use plinth_config::value::ConfigValue;
use std::any::{type_name, Any};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, OnceLock};

/// Shared pointer to a component instance.
pub type ComponentInstancePtr<T> = Arc<T>;

/// Type-erased shared pointer used when wiring dependencies.
pub type ComponentInstanceAnyPtr = ComponentInstancePtr<dyn Any + Send + Sync + 'static>;

/// Shared pointer to an instance behind the capability-probing trait.
pub type InstancePtr = ComponentInstancePtr<dyn ComponentInstance>;

/// Opaque error returned by component-supplied lifecycle operations.
pub type ErrorPtr = Arc<dyn std::error::Error + Send + Sync>;

/// An object managed by the container. Every capability accessor defaults to
/// `None`; instances override the ones they support.
pub trait ComponentInstance: Any + Send + Sync {
    fn as_wirable(&self) -> Option<&dyn Wirable> {
        None
    }

    fn as_startable(&self) -> Option<&dyn Startable> {
        None
    }

    fn as_blocker(&self) -> Option<&dyn Blocker> {
        None
    }

    fn as_accessible(&self) -> Option<&dyn Accessible> {
        None
    }

    fn as_stoppable(&self) -> Option<&dyn Stoppable> {
        None
    }

    fn as_decorator(&self) -> Option<&dyn Decorator> {
        None
    }

    fn as_namer(&self) -> Option<&dyn Namer> {
        None
    }

    fn as_container_aware(&self) -> Option<&dyn ContainerAware> {
        None
    }
}

/// A live, named component in the container's graph.
#[derive(Clone)]
pub struct Component {
    pub name: String,
    pub instance: InstancePtr,
}

impl Component {
    pub fn new(name: impl Into<String>, instance: InstancePtr) -> Self {
        Self {
            name: name.into(),
            instance,
        }
    }
}

impl Debug for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Coarse run state a component can track for itself, typically to make
/// `start_component` idempotent.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub enum ComponentState {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// A component that must be started before the container allows access.
pub trait Startable {
    fn start_component(&self) -> Result<(), ErrorPtr>;
}

/// A component that can veto the transition from started to accessible.
/// `Ok(true)` blocks silently, `Ok(false)` clears the veto and `Err` blocks
/// with a reason the container will log.
pub trait Blocker {
    fn block_access(&self) -> Result<bool, ErrorPtr>;
}

/// A component told when the container opens for business.
pub trait Accessible {
    fn allow_access(&self) -> Result<(), ErrorPtr>;
}

/// A component participating in orderly shutdown. `ready_to_stop` follows the
/// same convention as [Blocker::block_access]: `Err` means not ready, with a
/// reason to log.
pub trait Stoppable {
    fn prepare_to_stop(&self);

    fn ready_to_stop(&self) -> Result<bool, ErrorPtr>;

    fn stop(&self) -> Result<(), ErrorPtr>;
}

/// A meta-component run against every other component before lifecycle start.
///
/// Decoration order is unspecified: decorators must be commutative with each
/// other. Decorators are scaffolding and are removed from the container once
/// decoration completes.
pub trait Decorator {
    fn of_interest(&self, component: &Component) -> bool;

    fn decorate_component(&self, component: &Component, finder: &ComponentFinderPtr);
}

/// A component that wants to know its own registered name.
pub trait Namer {
    fn set_component_name(&self, name: &str);
}

/// A component that wants to look up peers at runtime. The container injects
/// a finder during decoration instead of handing out a container singleton.
pub trait ContainerAware {
    fn set_component_finder(&self, finder: ComponentFinderPtr);
}

/// By-name lookup surface offered to running components.
pub trait ComponentByNameFinder: Send + Sync {
    fn component_by_name(&self, name: &str) -> Option<Component>;
}

/// Shared handle to a [ComponentByNameFinder].
pub type ComponentFinderPtr = Arc<dyn ComponentByNameFinder>;

/// Wiring surface for components that receive dependencies or configuration.
/// Field names are the component's own vocabulary; unknown fields are
/// rejected.
pub trait Wirable {
    fn set_dependency(
        &self,
        field: &str,
        _dependency: InstancePtr,
    ) -> Result<(), WiringError> {
        Err(WiringError::UnknownField(field.to_string()))
    }

    fn set_config(&self, field: &str, _value: &ConfigValue) -> Result<(), WiringError> {
        Err(WiringError::UnknownField(field.to_string()))
    }
}

/// Late-bound, typed dependency holder. Wiring downcasts the incoming
/// instance to `T` exactly once; reads are lock-free afterwards.
pub struct Wired<T> {
    cell: OnceLock<ComponentInstancePtr<T>>,
}

impl<T> Default for Wired<T> {
    fn default() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }
}

impl<T: ComponentInstance> Wired<T> {
    /// Accepts a type-erased instance, rejecting anything that is not a `T`.
    pub fn accept(&self, instance: InstancePtr) -> Result<(), WiringError> {
        let any: ComponentInstanceAnyPtr = instance;

        let typed = any
            .downcast::<T>()
            .map_err(|_| WiringError::IncompatibleDependency {
                expected: type_name::<T>(),
            })?;

        self.cell
            .set(typed)
            .map_err(|_| WiringError::AlreadyWired)
    }
}

impl<T> Wired<T> {
    pub fn get(&self) -> Option<&T> {
        self.cell.get().map(|instance| instance.as_ref())
    }

    pub fn handle(&self) -> Option<ComponentInstancePtr<T>> {
        self.cell.get().cloned()
    }
}

/// Late-bound configuration value holder.
pub struct Setting<T> {
    cell: OnceLock<T>,
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }
}

impl<T: FromConfig> Setting<T> {
    /// Coerces a document leaf into `T` and stores it.
    pub fn apply(&self, value: &ConfigValue) -> Result<(), WiringError> {
        let parsed = T::from_config(value)?;

        self.cell
            .set(parsed)
            .map_err(|_| WiringError::AlreadyWired)
    }
}

impl<T> Setting<T> {
    /// Stores a value directly, bypassing coercion. Used by code assembling
    /// components programmatically.
    pub fn set(&self, value: T) -> Result<(), WiringError> {
        self.cell
            .set(value)
            .map_err(|_| WiringError::AlreadyWired)
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn cloned_or(&self, default: T) -> T
    where
        T: Clone,
    {
        self.cell.get().cloned().unwrap_or(default)
    }
}
