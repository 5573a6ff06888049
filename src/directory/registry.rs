// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot registry of the Zigbee2MQTT device and group directories.
//!
//! Each `bridge/devices` message replaces the device snapshot wholesale;
//! there is no merging. Snapshots are immutable and shared through `Arc`,
//! so a reader holding one never sees entries from two different refreshes.
//!
//! ```text
//! bridge/devices payload
//!         ↓
//!   parse_devices()
//!         ↓
//!   DeviceDirectory::new(entries, generation + 1)
//!         ↓
//!   RwLock<Arc<DeviceDirectory>>  ← swap under write lock
//!         ↓
//!   readers: snapshot() clones the Arc
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{DeviceDescriptor, GroupDescriptor};

/// An immutable device directory snapshot.
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    devices: Vec<DeviceDescriptor>,
    by_ieee: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
}

impl DeviceDirectory {
    fn new(devices: Vec<DeviceDescriptor>, generation: u64) -> Self {
        let mut by_ieee = HashMap::with_capacity(devices.len());
        let mut by_name = HashMap::with_capacity(devices.len());
        for (index, device) in devices.iter().enumerate() {
            by_ieee.insert(device.ieee_address.clone(), index);
            by_name.insert(device.friendly_name.clone(), index);
        }
        Self {
            devices,
            by_ieee,
            by_name,
            generation,
            refreshed_at: Some(Utc::now()),
        }
    }

    /// Looks up an entry by IEEE address.
    #[must_use]
    pub fn get(&self, ieee_address: &str) -> Option<&DeviceDescriptor> {
        self.by_ieee.get(ieee_address).map(|&i| &self.devices[i])
    }

    /// Looks up an entry by friendly name.
    #[must_use]
    pub fn by_friendly_name(&self, friendly_name: &str) -> Option<&DeviceDescriptor> {
        self.by_name.get(friendly_name).map(|&i| &self.devices[i])
    }

    /// Returns whether an IEEE address is present.
    #[must_use]
    pub fn contains(&self, ieee_address: &str) -> bool {
        self.by_ieee.contains_key(ieee_address)
    }

    /// Iterates over all entries except the coordinator.
    pub fn devices(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter().filter(|d| !d.is_coordinator())
    }

    /// Returns the number of entries, coordinator included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Returns whether the snapshot has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Returns the refresh counter; 0 means no directory received yet.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns when this snapshot was installed.
    #[must_use]
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }
}

/// An immutable group directory snapshot.
#[derive(Debug, Default)]
pub struct GroupDirectory {
    groups: Vec<GroupDescriptor>,
    generation: u64,
}

impl GroupDirectory {
    /// Looks up a group by friendly name.
    #[must_use]
    pub fn by_friendly_name(&self, friendly_name: &str) -> Option<&GroupDescriptor> {
        self.groups.iter().find(|g| g.friendly_name == friendly_name)
    }

    /// Returns all groups.
    #[must_use]
    pub fn groups(&self) -> &[GroupDescriptor] {
        &self.groups
    }

    /// Returns the refresh counter.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Last-known device and group directories of one bridge session.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<Arc<DeviceDirectory>>,
    groups: RwLock<Arc<GroupDirectory>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the device snapshot and returns the new one.
    pub fn replace_devices(&self, devices: Vec<DeviceDescriptor>) -> Arc<DeviceDirectory> {
        let mut slot = self.devices.write();
        let directory = Arc::new(DeviceDirectory::new(devices, slot.generation + 1));
        *slot = Arc::clone(&directory);
        tracing::debug!(
            generation = directory.generation,
            count = directory.len(),
            "Device directory replaced"
        );
        directory
    }

    /// Replaces the group snapshot and returns the new one.
    pub fn replace_groups(&self, groups: Vec<GroupDescriptor>) -> Arc<GroupDirectory> {
        let mut slot = self.groups.write();
        let directory = Arc::new(GroupDirectory {
            groups,
            generation: slot.generation + 1,
        });
        *slot = Arc::clone(&directory);
        tracing::debug!(
            generation = directory.generation,
            count = directory.groups.len(),
            "Group directory replaced"
        );
        directory
    }

    /// Returns the current device snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DeviceDirectory> {
        Arc::clone(&self.devices.read())
    }

    /// Returns the current group snapshot.
    #[must_use]
    pub fn group_snapshot(&self) -> Arc<GroupDirectory> {
        Arc::clone(&self.groups.read())
    }

    /// Looks up a device by IEEE address in the current snapshot.
    #[must_use]
    pub fn by_ieee(&self, ieee_address: &str) -> Option<DeviceDescriptor> {
        self.snapshot().get(ieee_address).cloned()
    }

    /// Looks up a device by friendly name in the current snapshot.
    #[must_use]
    pub fn by_friendly_name(&self, friendly_name: &str) -> Option<DeviceDescriptor> {
        self.snapshot().by_friendly_name(friendly_name).cloned()
    }

    /// Lists all devices except the coordinator.
    #[must_use]
    pub fn list_devices(&self) -> Vec<DeviceDescriptor> {
        self.snapshot().devices().cloned().collect()
    }

    /// Lists all groups.
    #[must_use]
    pub fn list_groups(&self) -> Vec<GroupDescriptor> {
        self.group_snapshot().groups().to_vec()
    }
}
