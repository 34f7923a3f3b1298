// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hub configuration.
//!
//! The configuration is read once at startup from a file (TOML, YAML, INI or
//! JSON, picked by extension) layered with `YEEHUB_*` environment variables,
//! then validated. Nothing mutates it afterwards.
//!
//! ```toml
//! [scan]
//! scan_interval_secs = 5
//! worker_count = 16
//!
//! [broker]
//! host = "192.168.1.2"
//! topic = "home/bulbs/toggle"
//! client_id = "yeehub"
//! ```
//!
//! Environment overrides use `__` between sections, e.g.
//! `YEEHUB_BROKER__HOST=10.0.0.5`.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::Subnet;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "YEEHUB";

/// Default MQTT broker port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;

/// Largest useful worker count: one worker per host address.
pub const MAX_WORKERS: usize = 256;

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_failure_backoff_ms() -> u64 {
    1000
}

fn default_vendor_signature() -> String {
    "yeelink".to_string()
}

fn default_bulb_timeout_ms() -> u64 {
    3000
}

fn default_broker_port() -> u16 {
    DEFAULT_BROKER_PORT
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_reconnect_interval_secs() -> u64 {
    5
}

/// Complete hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Subnet scanning settings.
    pub scan: ScanConfig,
    /// MQTT broker settings.
    pub broker: BrokerConfig,
}

/// Settings for the subnet sweep.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Fixed subnet prefix such as `192.168.178`. When absent the subnet is
    /// taken from the first local interface in `192.168.0.0/16`.
    #[serde(default)]
    pub subnet: Option<String>,
    /// Pause between two scan cycles, in seconds.
    pub scan_interval_secs: u64,
    /// Number of concurrent probe workers per cycle.
    pub worker_count: usize,
    /// Per-address reverse lookup timeout, in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Pause after a cycle failed unexpectedly, in milliseconds.
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,
    /// Hostname substring identifying a bulb.
    #[serde(default = "default_vendor_signature")]
    pub vendor_signature: String,
    /// Timeout for a single bulb command, in milliseconds.
    #[serde(default = "default_bulb_timeout_ms")]
    pub bulb_timeout_ms: u64,
}

impl ScanConfig {
    /// Returns the pause between scan cycles.
    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Returns the per-probe lookup timeout.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Returns the back-off applied after a failed cycle.
    #[must_use]
    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }

    /// Returns the bulb command timeout.
    #[must_use]
    pub fn bulb_timeout(&self) -> Duration {
        Duration::from_millis(self.bulb_timeout_ms)
    }

    /// Parses the configured subnet override, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the override is not of the form `a.b.c`.
    pub fn subnet_override(&self) -> Result<Option<Subnet>, ConfigError> {
        self.subnet
            .as_deref()
            .map(|s| {
                s.parse().map_err(|e: crate::error::ValueError| ConfigError::Invalid {
                    field: "scan.subnet",
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

/// Settings for the MQTT broker session.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name or address.
    pub host: String,
    /// Broker TCP port.
    #[serde(default = "default_broker_port")]
    pub port: u16,
    /// Topic carrying toggle commands.
    pub topic: String,
    /// MQTT client identifier.
    pub client_id: String,
    /// MQTT keep-alive, in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Period of the reconnect health check, in seconds.
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,
}

impl BrokerConfig {
    /// Creates a broker configuration with default port and timings.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        topic: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_BROKER_PORT,
            topic: topic.into(),
            client_id: client_id.into(),
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_interval_secs: default_reconnect_interval_secs(),
        }
    }

    /// Sets the broker port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Returns the keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Returns the reconnect health-check period.
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }
}

/// `YEEHUB_` override source; `vars` replaces the process environment.
fn environment(vars: Option<::config::Map<String, String>>) -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(vars)
}

impl HubConfig {
    /// Loads the configuration from `path` and `YEEHUB_*` environment
    /// variables, then validates it.
    ///
    /// `path` may omit the extension; the format is inferred from whichever
    /// matching file exists.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, a required key is missing,
    /// or a value fails validation.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Self::from_sources(::config::File::with_name(path), environment(None))?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    fn from_sources<F>(file: F, env: ::config::Environment) -> Result<Self, ConfigError>
    where
        F: ::config::Source + Send + Sync + 'static,
    {
        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value the hub depends on.
    ///
    /// # Errors
    ///
    /// Returns the first missing or invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let broker = &self.broker;
        if broker.host.trim().is_empty() {
            return Err(ConfigError::Missing("broker.host"));
        }
        if broker.topic.trim().is_empty() {
            return Err(ConfigError::Missing("broker.topic"));
        }
        if broker.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("broker.client_id"));
        }
        if broker.reconnect_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "broker.reconnect_interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        let scan = &self.scan;
        if !(1..=MAX_WORKERS).contains(&scan.worker_count) {
            return Err(ConfigError::Invalid {
                field: "scan.worker_count",
                message: format!("must be between 1 and {MAX_WORKERS}"),
            });
        }
        if scan.scan_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.scan_interval_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        if scan.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scan.probe_timeout_ms",
                message: "must be greater than zero".to_string(),
            });
        }
        if scan.vendor_signature.is_empty() {
            return Err(ConfigError::Missing("scan.vendor_signature"));
        }
        scan.subnet_override()?;

        Ok(())
    }
}
