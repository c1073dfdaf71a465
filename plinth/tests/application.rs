//! End-to-end boot: configuration merged from disk, user components wired
//! and configured, the query facility enabled, lifecycle driven both ways.

use plinth::application::{Application, ApplicationError};
use plinth_config::value::ConfigValue;
use plinth_ioc::component::{
    ComponentInstance, ComponentInstanceAnyPtr, ErrorPtr, Setting, Startable, Wirable,
};
use plinth_ioc::error::WiringError;
use plinth_ioc::proto::ProtoComponent;
use plinth_query::{QueryManager, QueryParams, TemplatedQueryManager, QUERY_MANAGER_COMPONENT};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Default)]
struct Greeter {
    greeting: Setting<String>,
    started: AtomicBool,
}

impl ComponentInstance for Greeter {
    fn as_wirable(&self) -> Option<&dyn Wirable> {
        Some(self)
    }

    fn as_startable(&self) -> Option<&dyn Startable> {
        Some(self)
    }
}

impl Wirable for Greeter {
    fn set_config(&self, field: &str, value: &ConfigValue) -> Result<(), WiringError> {
        match field {
            "greeting" => self.greeting.apply(value),
            other => Err(WiringError::UnknownField(other.to_string())),
        }
    }
}

impl Startable for Greeter {
    fn start_component(&self) -> Result<(), ErrorPtr> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn write_config(dir: &TempDir, name: &str, document: &ConfigValue) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, document.to_string()).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn should_boot_wire_and_shutdown() {
    let dir = TempDir::new().unwrap();

    std::fs::write(
        dir.path().join("queries.sql"),
        "ID:GREET\nSELECT greeting FROM messages WHERE lang=${lang}\n",
    )
    .unwrap();

    let config = write_config(
        &dir,
        "app.json",
        &json!({
            "plinth": {
                "logging": {"installTracingLogger": false},
                "container": {
                    "blockGate": {"retestIntervalMs": 10, "maxTries": 5, "warnAfterTries": 0},
                    "readyGate": {"retestIntervalMs": 10, "maxTries": 3, "warnAfterTries": 0}
                },
                "queryManager": {
                    "enabled": true,
                    "templateLocation": dir.path().to_str().unwrap()
                }
            },
            "app": {"greeting": "hello"}
        }),
    );

    let greeter = Arc::new(Greeter::default());

    let running = Application::new()
        .with_config_source(config)
        .with_proto(
            ProtoComponent::from_shared("greeter", greeter.clone())
                .with_config("greeting", "app.greeting"),
        )
        .boot()
        .unwrap();

    assert!(greeter.started.load(Ordering::SeqCst));
    assert_eq!(greeter.greeting.get().map(String::as_str), Some("hello"));

    let component = running.component_by_name(QUERY_MANAGER_COMPONENT).unwrap();
    let any: ComponentInstanceAnyPtr = component.instance.clone();
    let manager = any.downcast::<TemplatedQueryManager>().unwrap();

    let mut params = QueryParams::default();
    params.insert("lang".to_string(), json!("en"));

    assert_eq!(
        manager.build_query_from_id("GREET", &params).unwrap(),
        "SELECT greeting FROM messages WHERE lang=en\n"
    );

    assert!(running.finder().component_by_name("greeter").is_some());

    running.shutdown();
}

#[test]
fn should_leave_query_facility_out_unless_enabled() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "app.json",
        &json!({"plinth": {"logging": {"installTracingLogger": false}}}),
    );

    let running = Application::new().with_config_source(config).boot().unwrap();

    assert!(running.component_by_name(QUERY_MANAGER_COMPONENT).is_none());
    running.shutdown();
}

#[test]
fn should_fail_boot_on_unavailable_config_source() {
    let error = Application::new()
        .with_config_source("/no/such/config.json")
        .boot()
        .unwrap_err();

    assert!(matches!(error, ApplicationError::Merge(_)));
}

#[test]
fn should_fail_boot_on_missing_dependency() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "app.json",
        &json!({"plinth": {"logging": {"installTracingLogger": false}}}),
    );

    let error = Application::new()
        .with_config_source(config)
        .with_proto(ProtoComponent::new("lonely", Greeter::default()).with_dependency("svc", "ghost"))
        .boot()
        .unwrap_err();

    assert!(matches!(error, ApplicationError::Populate(_)));
}

struct Panicking;

impl ComponentInstance for Panicking {
    fn as_startable(&self) -> Option<&dyn Startable> {
        Some(self)
    }
}

impl Startable for Panicking {
    fn start_component(&self) -> Result<(), ErrorPtr> {
        panic!("wiring exploded");
    }
}

#[test]
fn should_convert_boot_panic_into_fatal_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        "app.json",
        &json!({"plinth": {"logging": {"installTracingLogger": false}}}),
    );

    let error = Application::new()
        .with_config_source(config)
        .with_proto(ProtoComponent::new("volatile", Panicking))
        .boot()
        .unwrap_err();

    assert!(matches!(error, ApplicationError::BootPanic(message) if message.contains("wiring exploded")));
}

#[test]
fn should_merge_user_sources_over_framework_defaults() {
    let dir = TempDir::new().unwrap();

    let first = write_config(
        &dir,
        "base.json",
        &json!({
            "plinth": {"logging": {"installTracingLogger": false}},
            "app": {"greeting": "hello", "tags": ["a"]}
        }),
    );
    let second = write_config(
        &dir,
        "override.json",
        &json!({"app": {"greeting": "hej", "tags": ["b"]}}),
    );

    let greeter = Arc::new(Greeter::default());

    let running = Application::new()
        .with_config_source(first)
        .with_config_source(second)
        .with_proto(
            ProtoComponent::from_shared("greeter", greeter.clone())
                .with_config("greeting", "app.greeting"),
        )
        .boot()
        .unwrap();

    assert_eq!(greeter.greeting.get().map(String::as_str), Some("hej"));
    running.shutdown();
}
