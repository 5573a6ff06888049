// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge configuration.
//!
//! A [`BridgeConfig`] describes one bridge session: which broker to talk to,
//! under which base topic Zigbee2MQTT publishes, and a few behaviour flags.
//! It can be built in code with [`BridgeConfig::builder`] or read from the
//! hub's settings through a [`SettingsStore`].
//!
//! # Examples
//!
//! ```
//! use z2m_bridge::config::{BridgeConfig, MapSettings};
//!
//! // In code
//! let config = BridgeConfig::builder()
//!     .host("mqtt://192.168.1.50:1883")
//!     .base_topic("zigbee2mqtt")
//!     .credentials("user", "password")
//!     .build()
//!     .unwrap();
//! assert_eq!(config.port(), 1883);
//!
//! // From hub settings
//! let settings = MapSettings::from([("host", "broker.local"), ("port", "1884")]);
//! let config = BridgeConfig::from_settings("bridge-1", &settings).unwrap();
//! assert_eq!(config.broker_uri(), "tcp://broker.local:1884");
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::TemperatureScale;

/// Default Zigbee2MQTT base topic.
pub const DEFAULT_BASE_TOPIC: &str = "zigbee2mqtt";

/// Default MQTT port.
pub const DEFAULT_PORT: u16 = 1883;

/// Read-only access to the hub's settings for one bridge instance.
///
/// The hub owns storage; the bridge only reads connection parameters and
/// feature flags.
pub trait SettingsStore {
    /// Returns the value of `key`, or `None` if unset.
    fn setting(&self, key: &str) -> Option<String>;
}

/// A [`SettingsStore`] backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MapSettings {
    values: HashMap<String, String>,
}

impl MapSettings {
    /// Creates an empty settings map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a value, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for MapSettings {
    fn from(entries: [(K, V); N]) -> Self {
        Self {
            values: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SettingsStore for MapSettings {
    fn setting(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Configuration for one bridge session.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    session_id: String,
    host: String,
    port: u16,
    base_topic: String,
    client_id: String,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    temperature_scale: TemperatureScale,
    debug_logging: bool,
    debug_logging_duration: Duration,
}

impl BridgeConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Reads a configuration from hub settings.
    ///
    /// Recognised keys: `host` (required), `port`, `topic`, `client_id`,
    /// `username`, `password`, `debug_logging` (`true`/`false`) and
    /// `temperature_scale` (`C`/`F`). Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingSetting` if `host` is absent and
    /// `ConfigError::InvalidSetting` if a value cannot be parsed.
    pub fn from_settings(
        session_id: impl Into<String>,
        settings: &impl SettingsStore,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| settings.setting(key).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder()
            .session_id(session_id)
            .host(get("host").ok_or_else(|| ConfigError::MissingSetting("host".to_string()))?);

        if let Some(port) = get("port") {
            let port = port.trim().parse().map_err(|_| ConfigError::InvalidSetting {
                key: "port".to_string(),
                value: port.clone(),
            })?;
            builder = builder.port(port);
        }
        if let Some(topic) = get("topic") {
            builder = builder.base_topic(topic);
        }
        if let Some(client_id) = get("client_id") {
            builder = builder.client_id(client_id);
        }
        if let (Some(username), Some(password)) = (get("username"), settings.setting("password")) {
            builder = builder.credentials(username, password);
        }
        if let Some(flag) = get("debug_logging") {
            builder = builder.debug_logging(parse_flag("debug_logging", &flag)?);
        }
        if let Some(scale) = get("temperature_scale") {
            builder = builder.temperature_scale(scale.parse()?);
        }

        builder.build()
    }

    /// Returns the session identifier. All per-session state is keyed by it.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the broker host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the broker port.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the broker URI in `tcp://host:port` form.
    #[must_use]
    pub fn broker_uri(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }

    /// Returns the Zigbee2MQTT base topic, without trailing slash.
    #[must_use]
    pub fn base_topic(&self) -> &str {
        &self.base_topic
    }

    /// Returns the MQTT client identifier.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the credentials if configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .map(|(u, p)| (u.as_str(), p.as_str()))
    }

    /// Returns the MQTT keep-alive interval.
    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Returns the hub's locale temperature scale.
    #[must_use]
    pub fn temperature_scale(&self) -> TemperatureScale {
        self.temperature_scale
    }

    /// Returns whether verbose per-message logging starts enabled.
    #[must_use]
    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    /// Returns how long verbose logging stays enabled before it switches
    /// itself off.
    #[must_use]
    pub fn debug_logging_duration(&self) -> Duration {
        self.debug_logging_duration
    }

    /// Returns the wildcard subscription covering every Zigbee2MQTT topic.
    #[must_use]
    pub fn subscription_topic(&self) -> String {
        format!("{}/#", self.base_topic)
    }

    /// Returns the state topic of a device.
    #[must_use]
    pub fn device_topic(&self, friendly_name: &str) -> String {
        format!("{}/{friendly_name}", self.base_topic)
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Debug)]
pub struct BridgeConfigBuilder {
    session_id: Option<String>,
    host: String,
    port: Option<u16>,
    base_topic: String,
    client_id: Option<String>,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    temperature_scale: TemperatureScale,
    debug_logging: bool,
    debug_logging_duration: Duration,
}

impl Default for BridgeConfigBuilder {
    fn default() -> Self {
        Self {
            session_id: None,
            host: String::new(),
            port: None,
            base_topic: DEFAULT_BASE_TOPIC.to_string(),
            client_id: None,
            credentials: None,
            keep_alive: Duration::from_secs(30),
            temperature_scale: TemperatureScale::default(),
            debug_logging: false,
            debug_logging_duration: Duration::from_secs(30 * 60),
        }
    }
}

impl BridgeConfigBuilder {
    /// Sets the session identifier (default: the client id).
    #[must_use]
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// Sets the broker host. Accepts `mqtt://host:port`, `tcp://host:port`,
    /// `host:port` or a bare host; an explicit [`port`](Self::port) wins.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the broker port (default: 1883).
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the Zigbee2MQTT base topic (default: `zigbee2mqtt`).
    #[must_use]
    pub fn base_topic(mut self, topic: impl Into<String>) -> Self {
        self.base_topic = topic.into();
        self
    }

    /// Sets the MQTT client identifier (default: generated).
    #[must_use]
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Sets authentication credentials.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Sets the keep-alive interval (default: 30 seconds).
    #[must_use]
    pub fn keep_alive(mut self, duration: Duration) -> Self {
        self.keep_alive = duration;
        self
    }

    /// Sets the hub's locale temperature scale (default: Celsius).
    #[must_use]
    pub fn temperature_scale(mut self, scale: TemperatureScale) -> Self {
        self.temperature_scale = scale;
        self
    }

    /// Enables verbose per-message logging at startup.
    #[must_use]
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Sets how long verbose logging stays on (default: 30 minutes).
    #[must_use]
    pub fn debug_logging_duration(mut self, duration: Duration) -> Self {
        self.debug_logging_duration = duration;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the host is empty or carries an unparseable port,
    /// or if the base topic is empty.
    pub fn build(self) -> Result<BridgeConfig, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::MissingSetting("host".to_string()));
        }
        let (host, url_port) = parse_broker_address(&self.host)?;
        if host.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "host".to_string(),
                value: self.host,
            });
        }

        let base_topic = self.base_topic.trim().trim_end_matches('/').to_string();
        if base_topic.is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "topic".to_string(),
                value: self.base_topic,
            });
        }

        let client_id = self.client_id.unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().simple().to_string();
            format!("z2m_bridge_{}", &id[..8])
        });

        Ok(BridgeConfig {
            session_id: self.session_id.unwrap_or_else(|| client_id.clone()),
            host,
            port: self.port.or(url_port).unwrap_or(DEFAULT_PORT),
            base_topic,
            client_id,
            credentials: self.credentials,
            keep_alive: self.keep_alive,
            temperature_scale: self.temperature_scale,
            debug_logging: self.debug_logging,
            debug_logging_duration: self.debug_logging_duration,
        })
    }
}

/// Splits a broker address into host and optional port.
fn parse_broker_address(address: &str) -> Result<(String, Option<u16>), ConfigError> {
    let address = address.trim();
    let address = address
        .strip_prefix("mqtt://")
        .or_else(|| address.strip_prefix("tcp://"))
        .unwrap_or(address)
        .trim_end_matches('/');

    match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().map_err(|_| ConfigError::InvalidSetting {
                key: "host".to_string(),
                value: address.to_string(),
            })?;
            Ok((host.to_string(), Some(port)))
        }
        None => Ok((address.to_string(), None)),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidSetting {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
