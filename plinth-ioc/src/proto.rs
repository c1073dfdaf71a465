//! Proto-components: pre-wiring descriptors of components.
//!
//! A proto carries a name, an uninitialised instance and the wiring
//! intentions for it - which fields should receive which peer components and
//! which fields should receive which config paths. Protos are normally
//! emitted ahead of time by an external binder; the builder methods here are
//! the programmatic equivalent.

use crate::component::{Component, ComponentInstance, InstancePtr};
use fxhash::FxHashMap;
use std::sync::Arc;

/// Descriptor of a component before it is installed into the container.
#[derive(Debug)]
pub struct ProtoComponent {
    pub component: Component,

    /// `fieldName -> peer component name`.
    pub dependencies: FxHashMap<String, String>,

    /// `fieldName -> dotted config path`.
    pub config_promises: FxHashMap<String, String>,
}

impl ProtoComponent {
    /// Creates a proto with empty dependency and promise maps.
    pub fn new<T: ComponentInstance>(name: impl Into<String>, instance: T) -> Self {
        Self::from_shared(name, Arc::new(instance))
    }

    /// Creates a proto around an instance the caller keeps a handle to.
    pub fn from_shared(name: impl Into<String>, instance: InstancePtr) -> Self {
        Self {
            component: Component::new(name, instance),
            dependencies: FxHashMap::default(),
            config_promises: FxHashMap::default(),
        }
    }

    pub fn with_dependency(
        mut self,
        field: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        self.dependencies.insert(field.into(), component.into());
        self
    }

    pub fn with_config(mut self, field: impl Into<String>, path: impl Into<String>) -> Self {
        self.config_promises.insert(field.into(), path.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.component.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl ComponentInstance for Plain {}

    #[test]
    fn should_build_proto_with_wiring_intentions() {
        let proto = ProtoComponent::new("svc", Plain)
            .with_dependency("store", "storeComponent")
            .with_config("limit", "svc.limit");

        assert_eq!(proto.name(), "svc");
        assert_eq!(
            proto.dependencies.get("store").map(String::as_str),
            Some("storeComponent")
        );
        assert_eq!(
            proto.config_promises.get("limit").map(String::as_str),
            Some("svc.limit")
        );
    }
}
