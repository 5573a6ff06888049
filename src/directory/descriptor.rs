// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Zigbee2MQTT directory entries.
//!
//! These types mirror the JSON published on `<base>/bridge/devices` and
//! `<base>/bridge/groups`. Zigbee2MQTT nests vendor, model and exposes under
//! a `definition` object; [`DeviceDescriptor`] flattens that.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

/// Role of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceType {
    /// The Zigbee coordinator (the USB stick). Never claimed.
    Coordinator,
    /// Any router or end device.
    #[default]
    Device,
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("coordinator") {
            Self::Coordinator
        } else {
            Self::Device
        }
    }
}

/// One declared capability from a device's `exposes` list.
///
/// Simple capabilities (`occupancy`, `temperature`) carry a `name`.
/// Composite ones such as a `light` carry a `type` and nested `features`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct CapabilityDescriptor {
    /// Capability name, e.g. `occupancy`, `color_xy`, `action`.
    #[serde(default)]
    pub name: String,
    /// Expose type, e.g. `binary`, `numeric`, `light`, `composite`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Payload property the capability is reported under.
    #[serde(default)]
    pub property: Option<String>,
    /// Declared unit, e.g. `°C`, `%`, `lx`.
    #[serde(default)]
    pub unit: Option<String>,
    /// Nested features of a composite capability, in declaration order.
    #[serde(default)]
    pub features: Vec<CapabilityDescriptor>,
}

impl CapabilityDescriptor {
    /// Creates a simple named capability.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a composite capability of the given type.
    #[must_use]
    pub fn composite(kind: impl Into<String>, features: Vec<CapabilityDescriptor>) -> Self {
        Self {
            kind: kind.into(),
            features,
            ..Self::default()
        }
    }

    /// Sets the declared unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Returns whether a direct feature of this capability has `name`.
    #[must_use]
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f.name == name)
    }
}

/// A device entry from `<base>/bridge/devices`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawDevice")]
pub struct DeviceDescriptor {
    /// Stable hardware address, the primary key.
    pub ieee_address: String,
    /// Human-readable name, also the MQTT sub-topic.
    pub friendly_name: String,
    /// Coordinator or device.
    pub device_type: DeviceType,
    /// Declared capabilities, in declaration order.
    pub exposes: Vec<CapabilityDescriptor>,
    /// Vendor name, if the device is supported.
    pub vendor: Option<String>,
    /// Model identifier, if the device is supported.
    pub model: Option<String>,
}

impl DeviceDescriptor {
    /// Creates a device descriptor with no vendor information.
    #[must_use]
    pub fn new(
        ieee_address: impl Into<String>,
        friendly_name: impl Into<String>,
        exposes: Vec<CapabilityDescriptor>,
    ) -> Self {
        Self {
            ieee_address: ieee_address.into(),
            friendly_name: friendly_name.into(),
            device_type: DeviceType::Device,
            exposes,
            vendor: None,
            model: None,
        }
    }

    /// Returns whether this entry is the coordinator.
    #[must_use]
    pub fn is_coordinator(&self) -> bool {
        self.device_type == DeviceType::Coordinator
    }

    /// Finds a capability by name, searching composite features as well.
    #[must_use]
    pub fn capability(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.exposes.iter().find_map(|cap| {
            if cap.name == name {
                Some(cap)
            } else {
                cap.features.iter().find(|f| f.name == name)
            }
        })
    }
}

#[derive(Deserialize)]
struct RawDevice {
    ieee_address: String,
    #[serde(default)]
    friendly_name: String,
    #[serde(default, rename = "type")]
    device_type: Option<String>,
    #[serde(default)]
    definition: Option<RawDefinition>,
}

#[derive(Deserialize)]
struct RawDefinition {
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    exposes: Vec<CapabilityDescriptor>,
}

impl From<RawDevice> for DeviceDescriptor {
    fn from(raw: RawDevice) -> Self {
        let (vendor, model, exposes) = match raw.definition {
            Some(def) => (def.vendor, def.model, def.exposes),
            None => (None, None, Vec::new()),
        };
        Self {
            friendly_name: if raw.friendly_name.is_empty() {
                raw.ieee_address.clone()
            } else {
                raw.friendly_name
            },
            ieee_address: raw.ieee_address,
            device_type: raw.device_type.map(DeviceType::from).unwrap_or_default(),
            exposes,
            vendor,
            model,
        }
    }
}

/// A member of a Zigbee group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupMember {
    /// IEEE address of the member device.
    pub ieee_address: String,
    /// Endpoint of the member device.
    #[serde(default)]
    pub endpoint: u32,
}

/// A group entry from `<base>/bridge/groups`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupDescriptor {
    /// Numeric group id.
    pub id: u32,
    /// Human-readable group name.
    #[serde(default)]
    pub friendly_name: String,
    /// Member devices.
    #[serde(default)]
    pub members: Vec<GroupMember>,
}

/// Parses a `bridge/devices` payload.
///
/// Entries that fail to deserialize are skipped with a warning so that one
/// odd device cannot hide the rest of the directory.
///
/// # Errors
///
/// Returns error if the payload is not JSON or not a JSON array.
pub fn parse_devices(payload: &str) -> Result<Vec<DeviceDescriptor>, ParseError> {
    parse_entries(payload, "devices")
}

/// Parses a `bridge/groups` payload.
///
/// # Errors
///
/// Returns error if the payload is not JSON or not a JSON array.
pub fn parse_groups(payload: &str) -> Result<Vec<GroupDescriptor>, ParseError> {
    parse_entries(payload, "groups")
}

fn parse_entries<T: serde::de::DeserializeOwned>(
    payload: &str,
    what: &str,
) -> Result<Vec<T>, ParseError> {
    let Value::Array(entries) = serde_json::from_str::<Value>(payload)? else {
        return Err(ParseError::MalformedPayload(format!(
            "bridge/{what} payload is not an array"
        )));
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(error = %e, kind = what, "Skipping malformed directory entry");
                None
            }
        })
        .collect())
}
