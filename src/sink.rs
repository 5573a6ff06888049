// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The hub side of the bridge.
//!
//! The hub platform owns child devices and their storage. The bridge only
//! reaches it through [`DeviceSink`]. Devices are keyed by IEEE address.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::classify::DriverProfile;
use crate::directory::DeviceDescriptor;
use crate::translate::AttributeEvent;

/// Property holding the Zigbee2MQTT friendly name.
pub const PROPERTY_FRIENDLY_NAME: &str = "friendlyName";
/// Property holding the device vendor.
pub const PROPERTY_VENDOR: &str = "vendor";
/// Property holding the device model.
pub const PROPERTY_MODEL: &str = "model";

/// A child device known to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Device key, the IEEE address.
    pub key: String,
    /// Driver name the device runs.
    pub profile_name: String,
    /// Driver namespace.
    pub namespace: String,
    /// Properties recorded at creation.
    pub properties: BTreeMap<String, String>,
}

impl DeviceHandle {
    /// Returns a recorded property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}

/// Creation properties for a directory entry.
#[must_use]
pub fn device_properties(device: &DeviceDescriptor) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    properties.insert(
        PROPERTY_FRIENDLY_NAME.to_string(),
        device.friendly_name.clone(),
    );
    if let Some(vendor) = &device.vendor {
        properties.insert(PROPERTY_VENDOR.to_string(), vendor.clone());
    }
    if let Some(model) = &device.model {
        properties.insert(PROPERTY_MODEL.to_string(), model.clone());
    }
    properties
}

/// Child device collaborator.
///
/// Implementations use interior mutability; the session holds the sink
/// behind an `Arc`.
pub trait DeviceSink: Send + Sync {
    /// Delivers attribute events to the device with `device_key`.
    fn emit(&self, device_key: &str, events: &[AttributeEvent]);

    /// Looks up a child device.
    fn find_device_by_key(&self, key: &str) -> Option<DeviceHandle>;

    /// Creates a child device running `profile`, replacing any device with
    /// the same key.
    fn create_device(
        &self,
        profile: DriverProfile,
        key: &str,
        properties: BTreeMap<String, String>,
    ) -> DeviceHandle;

    /// Lists every child device.
    fn list_claimed_devices(&self) -> Vec<DeviceHandle>;
}

/// In-memory [`DeviceSink`] that records everything it is given.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use z2m_bridge::classify::DriverProfile;
/// use z2m_bridge::sink::{DeviceSink, MemorySink};
///
/// let sink = MemorySink::new();
/// sink.create_device(DriverProfile::Switch, "0x01", BTreeMap::new());
/// assert_eq!(sink.list_claimed_devices().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    devices: RwLock<BTreeMap<String, DeviceHandle>>,
    emitted: RwLock<Vec<(String, Vec<AttributeEvent>)>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink pre-populated with `handles`.
    #[must_use]
    pub fn with_devices(handles: impl IntoIterator<Item = DeviceHandle>) -> Self {
        let sink = Self::default();
        sink.devices
            .write()
            .extend(handles.into_iter().map(|h| (h.key.clone(), h)));
        sink
    }

    /// Returns every event emitted to `device_key`, oldest first.
    #[must_use]
    pub fn events_for(&self, device_key: &str) -> Vec<AttributeEvent> {
        self.emitted
            .read()
            .iter()
            .filter(|(key, _)| key == device_key)
            .flat_map(|(_, events)| events.iter().cloned())
            .collect()
    }

    /// Returns the number of `emit` calls received.
    #[must_use]
    pub fn emit_count(&self) -> usize {
        self.emitted.read().len()
    }
}

impl DeviceSink for MemorySink {
    fn emit(&self, device_key: &str, events: &[AttributeEvent]) {
        self.emitted
            .write()
            .push((device_key.to_string(), events.to_vec()));
    }

    fn find_device_by_key(&self, key: &str) -> Option<DeviceHandle> {
        self.devices.read().get(key).cloned()
    }

    fn create_device(
        &self,
        profile: DriverProfile,
        key: &str,
        properties: BTreeMap<String, String>,
    ) -> DeviceHandle {
        let handle = DeviceHandle {
            key: key.to_string(),
            profile_name: profile.name().to_string(),
            namespace: profile.namespace().to_string(),
            properties,
        };
        self.devices.write().insert(key.to_string(), handle.clone());
        handle
    }

    fn list_claimed_devices(&self) -> Vec<DeviceHandle> {
        self.devices.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Attribute;
    use crate::types::ContactState;

    #[test]
    fn properties_include_vendor_and_model() {
        let mut device = DeviceDescriptor::new("0x01", "Front Door", Vec::new());
        device.vendor = Some("Aqara".to_string());
        device.model = Some("MCCGQ11LM".to_string());

        let properties = device_properties(&device);
        assert_eq!(properties.get(PROPERTY_FRIENDLY_NAME).unwrap(), "Front Door");
        assert_eq!(properties.get(PROPERTY_VENDOR).unwrap(), "Aqara");
        assert_eq!(properties.get(PROPERTY_MODEL).unwrap(), "MCCGQ11LM");
    }

    #[test]
    fn properties_skip_missing_definition() {
        let device = DeviceDescriptor::new("0x01", "Unknown", Vec::new());
        assert_eq!(device_properties(&device).len(), 1);
    }

    #[test]
    fn create_replaces_existing_device() {
        let sink = MemorySink::new();
        sink.create_device(DriverProfile::Switch, "0x01", BTreeMap::new());
        let handle = sink.create_device(DriverProfile::Rgbw, "0x01", BTreeMap::new());

        assert_eq!(handle.profile_name, "Generic Component RGBW");
        assert_eq!(sink.list_claimed_devices().len(), 1);
        assert_eq!(sink.find_device_by_key("0x01"), Some(handle));
    }

    #[test]
    fn emitted_events_are_recorded_per_device() {
        let sink = MemorySink::new();
        let contact = AttributeEvent::new(Attribute::Contact(ContactState::Closed));
        sink.emit("0x01", std::slice::from_ref(&contact));
        sink.emit("0x02", &[]);

        assert_eq!(sink.emit_count(), 2);
        assert_eq!(sink.events_for("0x01"), vec![contact]);
        assert!(sink.events_for("0x03").is_empty());
    }
}
