//! An inversion-of-control component container and lifecycle driver.
//!
//! The container takes a catalogue of proto-components - name, instance and
//! declarative wiring intentions, normally emitted ahead of time by a binder
//! tool - and materialises a live graph of wired, configured components. It
//! then drives the graph through a multi-phase lifecycle: start every
//! [Startable](component::Startable), hold at the block gate until no
//! [Blocker](component::Blocker) vetoes access, open every
//! [Accessible](component::Accessible), and on the way down take every
//! [Stoppable](component::Stoppable) through prepare, readiness polling and
//! stop.
//!
//! Capabilities are discovered by probing the instance, and wiring goes
//! through the explicit [Wirable](component::Wirable) contract rather than
//! reflection.
//!
//! ### Wiring two components
//!
//! ```
//! use plinth_config::accessor::ConfigAccessor;
//! use plinth_ioc::component::{ComponentInstance, Wirable, Wired};
//! use plinth_ioc::container::ComponentContainer;
//! use plinth_ioc::error::WiringError;
//! use plinth_ioc::proto::ProtoComponent;
//!
//! #[derive(Default)]
//! struct Store;
//!
//! impl ComponentInstance for Store {}
//!
//! #[derive(Default)]
//! struct Service {
//!     store: Wired<Store>,
//! }
//!
//! impl ComponentInstance for Service {
//!     fn as_wirable(&self) -> Option<&dyn Wirable> {
//!         Some(self)
//!     }
//! }
//!
//! impl Wirable for Service {
//!     fn set_dependency(
//!         &self,
//!         field: &str,
//!         dependency: plinth_ioc::component::InstancePtr,
//!     ) -> Result<(), WiringError> {
//!         match field {
//!             "store" => self.store.accept(dependency),
//!             other => Err(WiringError::UnknownField(other.to_string())),
//!         }
//!     }
//! }
//!
//! let mut container = ComponentContainer::new(ConfigAccessor::default());
//! container.wrap_and_add("store", Store::default());
//! container.add_proto(
//!     ProtoComponent::new("service", Service::default()).with_dependency("store", "store"),
//! );
//!
//! container.populate().unwrap();
//! assert!(container.component_by_name("service").is_some());
//! ```

pub mod component;
pub mod container;
pub mod error;
pub mod lifecycle;
pub mod proto;

/// Reserved prefix for framework component names and configuration keys.
pub const FRAMEWORK_PREFIX: &str = "plinth";
