// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Classification of inbound Zigbee2MQTT topics.
//!
//! Rules are checked in order, first match wins:
//!
//! ```text
//! <base>/bridge/devices         → DeviceDirectory
//! <base>/bridge/groups[...]     → GroupDirectory
//! <base>/bridge/<anything>      → BridgeInfo      (ignored)
//! <base>/<name>/.../<reserved>  → Reserved        (ignored)
//! <base>/<name>                 → DeviceState(name)
//! anything else                 → Ignored
//! ```
//!
//! Reserved suffixes are filtered before the device-state rule because
//! devices echo `/set` and `/get` traffic that looks like state.

/// Trailing topic segments that never carry device state.
pub const RESERVED_SUFFIXES: [&str; 5] = ["click", "action", "get", "set", "availability"];

const BRIDGE_DEVICES: &str = "bridge/devices";
const BRIDGE_GROUPS: &str = "bridge/groups";
const BRIDGE_PREFIX: &str = "bridge/";

/// What an inbound topic means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// The device directory. Replaces the registry snapshot.
    DeviceDirectory,
    /// The group directory.
    GroupDirectory,
    /// Any other bridge topic (`bridge/state`, `bridge/info`, ...).
    BridgeInfo,
    /// A nested device topic ending in a reserved suffix.
    Reserved {
        /// The reserved suffix.
        suffix: &'a str,
    },
    /// State published by a device.
    DeviceState {
        /// Friendly name taken from the topic.
        friendly_name: &'a str,
    },
    /// Not under the base topic, or nested without a reserved suffix.
    Ignored,
}

impl Route<'_> {
    /// Returns whether the message should be dropped.
    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::BridgeInfo | Self::Reserved { .. } | Self::Ignored)
    }
}

/// Classifies `topic` relative to `base_topic`.
///
/// # Examples
///
/// ```
/// use z2m_bridge::protocol::{Route, classify_topic};
///
/// assert_eq!(classify_topic("zigbee2mqtt", "zigbee2mqtt/bridge/devices"), Route::DeviceDirectory);
/// assert_eq!(
///     classify_topic("zigbee2mqtt", "zigbee2mqtt/Kitchen Lamp"),
///     Route::DeviceState { friendly_name: "Kitchen Lamp" }
/// );
/// assert!(classify_topic("zigbee2mqtt", "zigbee2mqtt/Kitchen Lamp/set").is_ignored());
/// ```
#[must_use]
pub fn classify_topic<'a>(base_topic: &str, topic: &'a str) -> Route<'a> {
    let Some(rest) = topic
        .strip_prefix(base_topic)
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return Route::Ignored;
    };

    if rest == BRIDGE_DEVICES {
        return Route::DeviceDirectory;
    }
    if rest.starts_with(BRIDGE_GROUPS) {
        return Route::GroupDirectory;
    }
    if rest.starts_with(BRIDGE_PREFIX) {
        return Route::BridgeInfo;
    }

    match rest.rsplit_once('/') {
        Some((_, suffix)) if RESERVED_SUFFIXES.iter().any(|r| *r == suffix) => Route::Reserved { suffix },
        Some(_) => Route::Ignored,
        None if rest.is_empty() => Route::Ignored,
        None => Route::DeviceState {
            friendly_name: rest,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "zigbee2mqtt";

    #[test]
    fn device_directory() {
        assert_eq!(
            classify_topic(BASE, "zigbee2mqtt/bridge/devices"),
            Route::DeviceDirectory
        );
    }

    #[test]
    fn group_directory_by_prefix() {
        assert_eq!(
            classify_topic(BASE, "zigbee2mqtt/bridge/groups"),
            Route::GroupDirectory
        );
    }

    #[test]
    fn other_bridge_topics_are_info() {
        for topic in [
            "zigbee2mqtt/bridge/state",
            "zigbee2mqtt/bridge/info",
            "zigbee2mqtt/bridge/logging",
            "zigbee2mqtt/bridge/devices/extra",
            "zigbee2mqtt/bridge/event",
        ] {
            assert_eq!(classify_topic(BASE, topic), Route::BridgeInfo, "{topic}");
        }
    }

    #[test]
    fn reserved_suffixes_never_route_to_state() {
        for suffix in RESERVED_SUFFIXES {
            let topic = format!("zigbee2mqtt/Hall Sensor/{suffix}");
            let route = classify_topic(BASE, &topic);
            assert_eq!(route, Route::Reserved { suffix });
            assert!(route.is_ignored());
        }
    }

    #[test]
    fn deeper_reserved_suffix() {
        assert_eq!(
            classify_topic(BASE, "zigbee2mqtt/Remote/l1/action"),
            Route::Reserved { suffix: "action" }
        );
    }

    #[test]
    fn device_state() {
        assert_eq!(
            classify_topic(BASE, "zigbee2mqtt/0x00158d0001a2b3c4"),
            Route::DeviceState {
                friendly_name: "0x00158d0001a2b3c4"
            }
        );
    }

    #[test]
    fn device_named_like_a_suffix_is_state() {
        assert_eq!(
            classify_topic(BASE, "zigbee2mqtt/set"),
            Route::DeviceState {
                friendly_name: "set"
            }
        );
    }

    #[test]
    fn nested_non_reserved_topics_are_ignored() {
        assert_eq!(
            classify_topic(BASE, "zigbee2mqtt/Kitchen Lamp/config"),
            Route::Ignored
        );
    }

    #[test]
    fn foreign_topics_are_ignored() {
        assert_eq!(classify_topic(BASE, "homeassistant/status"), Route::Ignored);
        assert_eq!(classify_topic(BASE, "zigbee2mqttx/lamp"), Route::Ignored);
        assert_eq!(classify_topic(BASE, "zigbee2mqtt"), Route::Ignored);
        assert_eq!(classify_topic(BASE, "zigbee2mqtt/"), Route::Ignored);
    }

    #[test]
    fn custom_base_topic() {
        assert_eq!(
            classify_topic("home/z2m", "home/z2m/bridge/devices"),
            Route::DeviceDirectory
        );
        assert_eq!(
            classify_topic("home/z2m", "home/z2m/Porch"),
            Route::DeviceState {
                friendly_name: "Porch"
            }
        );
    }
}
