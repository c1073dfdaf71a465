//! The phase engine taking components through start, block, access and stop.
//!
//! Both gates poll at a fixed interval: the block gate refuses to open the
//! container while any [Blocker](crate::component::Blocker) holds its veto,
//! and the ready gate delays shutdown until every
//! [Stoppable](crate::component::Stoppable) reports ready - but never
//! indefinitely.

use crate::component::Component;
use crate::error::LifecycleError;
use derive_more::Constructor;
use std::thread;
use std::time::Duration;
use tracing::{error, warn};

/// Polling parameters for a lifecycle gate.
#[derive(Clone, Copy, Debug, Constructor)]
pub struct GateSettings {
    /// Pause between polls.
    pub retest_interval: Duration,

    /// Number of polls before the gate gives up.
    pub max_tries: u32,

    /// Number of polls after which laggards are logged.
    pub warn_after_tries: u32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 12, 0)
    }
}

/// Gate parameters for both lifecycle transitions.
#[derive(Clone, Copy, Debug, Constructor)]
pub struct LifecycleSettings {
    pub block_gate: GateSettings,
    pub ready_gate: GateSettings,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            block_gate: GateSettings::new(Duration::from_secs(5), 12, 0),
            ready_gate: GateSettings::new(Duration::from_secs(5), 10, 3),
        }
    }
}

/// Polls every blocker until none veto access or the gate is exhausted.
pub(crate) fn wait_for_blockers(
    blockers: &[Component],
    gate: &GateSettings,
) -> Result<(), LifecycleError> {
    let mut names = Vec::new();

    for attempt in 0..gate.max_tries {
        names = blocking_components(blockers, attempt > gate.warn_after_tries);

        if names.is_empty() {
            return Ok(());
        }

        thread::sleep(gate.retest_interval);
    }

    Err(LifecycleError::StartupBlocked(names))
}

fn blocking_components(blockers: &[Component], warn: bool) -> Vec<String> {
    let mut names = Vec::new();

    for component in blockers {
        let Some(blocker) = component.instance.as_blocker() else {
            continue;
        };

        let blocked = match blocker.block_access() {
            Ok(blocked) => {
                if blocked && warn {
                    error!("{} blocking startup (no reason given)", component.name);
                }
                blocked
            }
            Err(reason) => {
                if warn {
                    error!("{} blocking startup: {}", component.name, reason);
                }
                true
            }
        };

        if blocked {
            names.push(component.name.clone());
        }
    }

    names
}

/// Polls every stoppable until all report ready or the gate is exhausted.
/// Exhaustion is logged, not fatal: a shutdown never hangs here.
pub(crate) fn wait_until_ready_to_stop(stoppable: &[Component], gate: &GateSettings) {
    for attempt in 0..gate.max_tries {
        if count_not_ready(stoppable, attempt > gate.warn_after_tries) == 0 {
            return;
        }

        thread::sleep(gate.retest_interval);
    }

    error!("some components are not ready to stop, stopping anyway");
}

fn count_not_ready(stoppable: &[Component], warn: bool) -> usize {
    let mut not_ready = 0;

    for component in stoppable {
        let Some(instance) = component.instance.as_stoppable() else {
            continue;
        };

        let ready = match instance.ready_to_stop() {
            Ok(ready) => {
                if !ready && warn {
                    warn!("{} is not ready to stop (no reason given)", component.name);
                }
                ready
            }
            Err(reason) => {
                if warn {
                    warn!("{} is not ready to stop: {}", component.name, reason);
                }
                false
            }
        };

        if !ready {
            not_ready += 1;
        }
    }

    not_ready
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Blocker, Component, ComponentInstance, ErrorPtr};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    struct CountdownBlocker {
        clear_after: u32,
        polls: AtomicU32,
    }

    impl CountdownBlocker {
        fn new(clear_after: u32) -> Self {
            Self {
                clear_after,
                polls: AtomicU32::new(0),
            }
        }
    }

    impl ComponentInstance for CountdownBlocker {
        fn as_blocker(&self) -> Option<&dyn Blocker> {
            Some(self)
        }
    }

    impl Blocker for CountdownBlocker {
        fn block_access(&self) -> Result<bool, ErrorPtr> {
            let seen = self.polls.fetch_add(1, Ordering::SeqCst);
            Ok(seen < self.clear_after)
        }
    }

    fn blocker_component(clear_after: u32) -> Component {
        Component::new("gate", Arc::new(CountdownBlocker::new(clear_after)))
    }

    #[test]
    fn should_open_gate_once_blocker_clears() {
        let gate = GateSettings::new(Duration::from_millis(10), 12, 0);
        let started = Instant::now();

        wait_for_blockers(&[blocker_component(2)], &gate).unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(20));
        assert!(elapsed < Duration::from_millis(120));
    }

    #[test]
    fn should_fail_gate_when_blocker_never_clears() {
        let gate = GateSettings::new(Duration::from_millis(5), 4, 0);

        let error = wait_for_blockers(&[blocker_component(u32::MAX)], &gate).unwrap_err();

        assert!(
            matches!(error, LifecycleError::StartupBlocked(names) if names == vec!["gate".to_string()])
        );
    }

    #[test]
    fn should_bound_gate_wall_time() {
        let gate = GateSettings::new(Duration::from_millis(5), 4, 0);
        let started = Instant::now();

        let _ = wait_for_blockers(&[blocker_component(u32::MAX)], &gate);

        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
