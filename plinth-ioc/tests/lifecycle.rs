//! Lifecycle-phase behavior: start ordering, the block and ready gates, and
//! shutdown guarantees.

use plinth_config::accessor::ConfigAccessor;
use plinth_ioc::component::{
    Accessible, Blocker, ComponentInstance, ErrorPtr, Startable, Stoppable,
};
use plinth_ioc::container::ComponentContainer;
use plinth_ioc::error::LifecycleError;
use plinth_ioc::lifecycle::{GateSettings, LifecycleSettings};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type EventLog = Arc<Mutex<Vec<String>>>;

fn record(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

fn position(events: &[String], needle: &str) -> usize {
    events
        .iter()
        .position(|event| event == needle)
        .unwrap_or_else(|| panic!("event {needle} not recorded in {events:?}"))
}

fn fast_settings() -> LifecycleSettings {
    LifecycleSettings::new(
        GateSettings::new(Duration::from_millis(10), 12, 0),
        GateSettings::new(Duration::from_millis(10), 4, 0),
    )
}

struct Recording {
    label: &'static str,
    log: EventLog,
    unblock_after: u32,
    ready_after: u32,
    polls: AtomicU32,
    ready_polls: AtomicU32,
    fail_start: bool,
    fail_stop: bool,
}

impl Recording {
    fn new(label: &'static str, log: EventLog) -> Self {
        Self {
            label,
            log,
            unblock_after: 0,
            ready_after: 0,
            polls: AtomicU32::new(0),
            ready_polls: AtomicU32::new(0),
            fail_start: false,
            fail_stop: false,
        }
    }

    fn unblock_after(mut self, polls: u32) -> Self {
        self.unblock_after = polls;
        self
    }

    fn ready_after(mut self, polls: u32) -> Self {
        self.ready_after = polls;
        self
    }

    fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn fail_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    fn error(&self, message: &str) -> ErrorPtr {
        Arc::new(std::io::Error::other(format!("{}: {message}", self.label)))
    }
}

impl ComponentInstance for Recording {
    fn as_startable(&self) -> Option<&dyn Startable> {
        Some(self)
    }

    fn as_blocker(&self) -> Option<&dyn Blocker> {
        Some(self)
    }

    fn as_accessible(&self) -> Option<&dyn Accessible> {
        Some(self)
    }

    fn as_stoppable(&self) -> Option<&dyn Stoppable> {
        Some(self)
    }
}

impl Startable for Recording {
    fn start_component(&self) -> Result<(), ErrorPtr> {
        record(&self.log, format!("start:{}", self.label));

        if self.fail_start {
            return Err(self.error("refusing to start"));
        }

        Ok(())
    }
}

impl Blocker for Recording {
    fn block_access(&self) -> Result<bool, ErrorPtr> {
        record(&self.log, format!("block:{}", self.label));
        let seen = self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(seen < self.unblock_after)
    }
}

impl Accessible for Recording {
    fn allow_access(&self) -> Result<(), ErrorPtr> {
        record(&self.log, format!("allow:{}", self.label));
        Ok(())
    }
}

impl Stoppable for Recording {
    fn prepare_to_stop(&self) {
        record(&self.log, format!("prepare:{}", self.label));
    }

    fn ready_to_stop(&self) -> Result<bool, ErrorPtr> {
        let seen = self.ready_polls.fetch_add(1, Ordering::SeqCst);
        Ok(seen >= self.ready_after)
    }

    fn stop(&self) -> Result<(), ErrorPtr> {
        record(&self.log, format!("stop:{}", self.label));

        if self.fail_stop {
            return Err(self.error("refusing to stop"));
        }

        Ok(())
    }
}

fn container_with(components: Vec<(&'static str, Recording)>) -> ComponentContainer {
    let mut container =
        ComponentContainer::with_settings(ConfigAccessor::default(), fast_settings());

    for (name, component) in components {
        container.wrap_and_add(name, component);
    }

    container.populate().unwrap();
    container
}

#[test]
fn should_order_start_before_block_before_allow() {
    let log: EventLog = EventLog::default();

    let mut container = container_with(vec![
        ("a", Recording::new("a", log.clone())),
        ("b", Recording::new("b", log.clone())),
    ]);

    container.start_components().unwrap();
    container.shutdown_components();

    let events = log.lock().unwrap().clone();

    for label in ["a", "b"] {
        let start = position(&events, &format!("start:{label}"));
        let block = position(&events, &format!("block:{label}"));
        let allow = position(&events, &format!("allow:{label}"));
        let prepare = position(&events, &format!("prepare:{label}"));
        let stop = position(&events, &format!("stop:{label}"));

        assert!(start < block, "start must precede block polling");
        assert!(block < allow, "block gate must clear before access");
        assert!(prepare < stop, "prepare must precede stop");
    }

    // phase barriers: every start precedes every allow
    let last_start = ["a", "b"]
        .iter()
        .map(|label| position(&events, &format!("start:{label}")))
        .max()
        .unwrap();
    let first_allow = ["a", "b"]
        .iter()
        .map(|label| position(&events, &format!("allow:{label}")))
        .min()
        .unwrap();
    assert!(last_start < first_allow);
}

#[test]
fn should_open_block_gate_after_blocker_clears() {
    let log: EventLog = EventLog::default();

    let mut container =
        container_with(vec![("gate", Recording::new("gate", log.clone()).unblock_after(2))]);

    let started = Instant::now();
    container.start_components().unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(120));
}

#[test]
fn should_fail_start_when_block_gate_exhausts() {
    let log: EventLog = EventLog::default();

    let mut container = container_with(vec![(
        "stuck",
        Recording::new("stuck", log.clone()).unblock_after(u32::MAX),
    )]);

    let error = container.start_components().unwrap_err();

    assert!(matches!(
        error,
        LifecycleError::StartupBlocked(names) if names == vec!["stuck".to_string()]
    ));

    let events = log.lock().unwrap().clone();
    assert!(!events.iter().any(|event| event.starts_with("allow:")));
}

#[test]
fn should_abort_start_on_component_failure_leaving_started_running() {
    let log: EventLog = EventLog::default();

    let mut container = container_with(vec![
        ("ok", Recording::new("ok", log.clone())),
        ("bad", Recording::new("bad", log.clone()).fail_start()),
        ("later", Recording::new("later", log.clone())),
    ]);

    let error = container.start_components().unwrap_err();

    assert!(matches!(
        error,
        LifecycleError::StartFailure { component, .. } if component == "bad"
    ));

    let events = log.lock().unwrap().clone();
    assert!(events.contains(&"start:ok".to_string()));
    assert!(events.contains(&"start:bad".to_string()));
    assert!(!events.contains(&"start:later".to_string()));

    // the caller is expected to drive shutdown; already-started components
    // are still stoppable
    container.shutdown_components();
    let events = log.lock().unwrap().clone();
    assert!(events.contains(&"stop:ok".to_string()));
}

#[test]
fn should_stop_never_ready_component_after_gate_exhausts() {
    let log: EventLog = EventLog::default();

    let mut container = container_with(vec![(
        "laggard",
        Recording::new("laggard", log.clone()).ready_after(u32::MAX),
    )]);

    container.start_components().unwrap();

    let started = Instant::now();
    container.shutdown_components();

    // four tries at 10ms, then stop proceeds anyway
    assert!(started.elapsed() >= Duration::from_millis(40));

    let events = log.lock().unwrap().clone();
    assert!(events.contains(&"stop:laggard".to_string()));
}

#[test]
fn should_suppress_stop_errors_and_complete_shutdown() {
    let log: EventLog = EventLog::default();

    let mut container = container_with(vec![
        ("bad", Recording::new("bad", log.clone()).fail_stop()),
        ("good", Recording::new("good", log.clone())),
    ]);

    container.start_components().unwrap();
    container.shutdown_components();

    let events = log.lock().unwrap().clone();
    assert!(events.contains(&"stop:bad".to_string()));
    assert!(events.contains(&"stop:good".to_string()));
}

#[test]
fn should_wait_for_delayed_readiness_before_stopping() {
    let log: EventLog = EventLog::default();

    let mut container = container_with(vec![(
        "slow",
        Recording::new("slow", log.clone()).ready_after(2),
    )]);

    container.start_components().unwrap();

    let started = Instant::now();
    container.shutdown_components();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(120));
}
