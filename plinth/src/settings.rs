//! Framework settings read from the reserved `plinth` key of the merged
//! configuration tree.
//!
//! The embedded defaults document is merged first, so every framework path a
//! facility promises against is guaranteed to exist; user sources then
//! override whichever keys they name.

use plinth_config::value::ConfigValue;
use plinth_ioc::lifecycle::{GateSettings, LifecycleSettings};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Settings controlling the framework itself.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameworkSettings {
    pub logging: LoggingSettings,
    pub container: ContainerSettings,
    pub query_manager: QueryFacilitySettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingSettings {
    /// Install a default tracing logger in the scope of the application.
    pub install_tracing_logger: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerSettings {
    pub block_gate: GateConfig,
    pub ready_gate: GateConfig,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            block_gate: GateConfig {
                retest_interval_ms: 5000,
                max_tries: 12,
                warn_after_tries: 0,
            },
            ready_gate: GateConfig {
                retest_interval_ms: 5000,
                max_tries: 10,
                warn_after_tries: 3,
            },
        }
    }
}

/// One lifecycle gate as it appears in configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateConfig {
    pub retest_interval_ms: u64,
    pub max_tries: u32,
    pub warn_after_tries: u32,
}

impl From<&GateConfig> for GateSettings {
    fn from(config: &GateConfig) -> Self {
        GateSettings::new(
            Duration::from_millis(config.retest_interval_ms),
            config.max_tries,
            config.warn_after_tries,
        )
    }
}

impl From<&ContainerSettings> for LifecycleSettings {
    fn from(settings: &ContainerSettings) -> Self {
        LifecycleSettings::new((&settings.block_gate).into(), (&settings.ready_gate).into())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QueryFacilitySettings {
    /// Register the query manager facility during boot.
    pub enabled: bool,
}

/// The defaults document merged beneath user sources. Facilities promise
/// their settings against these paths.
pub fn framework_defaults() -> ConfigValue {
    json!({
        "plinth": {
            "logging": {
                "installTracingLogger": true
            },
            "container": {
                "blockGate": {
                    "retestIntervalMs": 5000,
                    "maxTries": 12,
                    "warnAfterTries": 0
                },
                "readyGate": {
                    "retestIntervalMs": 5000,
                    "maxTries": 10,
                    "warnAfterTries": 3
                }
            },
            "queryManager": {
                "enabled": false,
                "templateLocation": "resource/queries",
                "varMatchRegex": "\\$\\{([^\\}]+)\\}",
                "queryIdPrefix": "ID:",
                "trimIdWhiteSpace": true
            }
        }
    })
}
