// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `z2m_bridge` - bridges Zigbee2MQTT devices into a home-automation hub.
//!
//! Zigbee2MQTT publishes every Zigbee device as JSON over MQTT. This crate
//! keeps a resilient broker session, turns device state payloads into
//! normalized hub attribute events and picks a hub driver for each device
//! from the capabilities it declares.
//!
//! # Components
//!
//! - [`session::ConnectionManager`]: connect, reconnect with backoff, watchdog
//! - [`protocol::classify_topic`]: what an inbound topic means
//! - [`directory::DeviceRegistry`]: atomically swapped device and group directory
//! - [`translate::PayloadTranslator`]: state payload to [`translate::AttributeEvent`]s
//! - [`classify::CapabilityClassifier`]: declared capabilities to [`classify::DriverProfile`]
//! - [`Bridge`]: the session task tying them together
//!
//! The hub itself is reached through [`sink::DeviceSink`] and settings are
//! read through [`config::SettingsStore`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use z2m_bridge::{Bridge, BridgeConfig, MapSettings, MemorySink, RumqttTransport};
//!
//! #[tokio::main]
//! async fn main() -> z2m_bridge::Result<()> {
//!     let settings = MapSettings::new()
//!         .with("host", "192.168.1.50")
//!         .with("topic", "zigbee2mqtt")
//!         .with("temperature_scale", "F");
//!     let config = BridgeConfig::from_settings("hub-bridge-1", &settings)?;
//!
//!     let sink = Arc::new(MemorySink::new());
//!     let bridge = Bridge::new(config, Box::new(RumqttTransport::new()), sink).spawn();
//!
//!     let mut events = bridge.events();
//!     while let Ok(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Logging
//!
//! The crate logs through `tracing` and never installs a subscriber.
//! Per-message detail is logged at `debug` only while verbose logging is
//! on; it switches itself off after the configured duration.

mod bridge;
pub mod claims;
pub mod classify;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod translate;
pub mod types;

pub use bridge::{Bridge, BridgeHandle, REQUEST_STATE_DELAY, WATCHDOG_PERIOD};
pub use claims::{Claim, ClaimTable, DriverAssignment};
pub use classify::{CapabilityClassifier, DriverProfile};
pub use config::{BridgeConfig, BridgeConfigBuilder, MapSettings, SettingsStore};
pub use directory::{CapabilityDescriptor, DeviceDescriptor, DeviceRegistry, GroupDescriptor};
pub use error::{ConfigError, Error, ParseError, Result, TransportError};
pub use event::{BridgeEvent, EventBus};
#[cfg(feature = "mqtt")]
pub use protocol::RumqttTransport;
pub use protocol::{ConnectOptions, Qos, Transport, TransportEvent, TransportStatus};
pub use session::ConnectionState;
pub use sink::{DeviceHandle, DeviceSink, MemorySink};
pub use translate::{Attribute, AttributeEvent, PayloadTranslator};
pub use types::TemperatureScale;
