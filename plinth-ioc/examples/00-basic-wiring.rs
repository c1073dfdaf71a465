use plinth_config::accessor::ConfigAccessor;
use plinth_ioc::component::{ComponentInstance, InstancePtr, Wirable, Wired};
use plinth_ioc::container::ComponentContainer;
use plinth_ioc::error::WiringError;
use plinth_ioc::proto::ProtoComponent;
use serde_json::json;
use std::sync::Arc;

#[derive(Default)]
struct AccountStore;

impl AccountStore {
    fn account_count(&self) -> usize {
        3
    }
}

impl ComponentInstance for AccountStore {}

#[derive(Default)]
struct AccountService {
    store: Wired<AccountStore>,
}

impl AccountService {
    fn describe(&self) -> String {
        match self.store.get() {
            Some(store) => format!("serving {} accounts", store.account_count()),
            None => "not wired yet".to_string(),
        }
    }
}

impl ComponentInstance for AccountService {
    fn as_wirable(&self) -> Option<&dyn Wirable> {
        Some(self)
    }
}

impl Wirable for AccountService {
    fn set_dependency(&self, field: &str, dependency: InstancePtr) -> Result<(), WiringError> {
        match field {
            "store" => self.store.accept(dependency),
            other => Err(WiringError::UnknownField(other.to_string())),
        }
    }
}

fn main() {
    let accessor = ConfigAccessor::new(json!({}));
    let service = Arc::new(AccountService::default());

    let mut container = ComponentContainer::new(accessor);
    container.wrap_and_add("accountStore", AccountStore);
    container.add_proto(
        ProtoComponent::from_shared("accountService", service.clone())
            .with_dependency("store", "accountStore"),
    );

    container.populate().expect("populate failed");
    container.start_components().expect("start failed");

    println!("{}", service.describe());

    container.shutdown_components();
}
