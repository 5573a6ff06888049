// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver assignments for claimed devices.
//!
//! An assignment is made once, when a device is claimed, and kept even if
//! the device later declares different capabilities. Only an explicit
//! [`rematch`](ClaimTable::rematch) replaces it.
//!
//! Claimed devices missing from a directory refresh are flagged abandoned.
//! They are never removed; an operator decides what to do with them.

use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{CapabilityClassifier, DriverProfile};
use crate::directory::{DeviceDescriptor, DeviceDirectory};
use crate::sink::{DeviceHandle, DeviceSink, device_properties};

/// The driver a claimed device runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverAssignment {
    /// IEEE address of the device.
    pub ieee_address: String,
    /// Driver name.
    pub profile_name: String,
    /// Driver namespace.
    pub namespace: String,
}

impl DriverAssignment {
    /// Creates an assignment to a known profile.
    #[must_use]
    pub fn new(ieee_address: impl Into<String>, profile: DriverProfile) -> Self {
        Self {
            ieee_address: ieee_address.into(),
            profile_name: profile.name().to_string(),
            namespace: profile.namespace().to_string(),
        }
    }

    /// Returns the profile, if the driver is one this crate knows.
    #[must_use]
    pub fn profile(&self) -> Option<DriverProfile> {
        DriverProfile::from_parts(&self.profile_name, &self.namespace)
    }
}

impl From<&DeviceHandle> for DriverAssignment {
    fn from(handle: &DeviceHandle) -> Self {
        Self {
            ieee_address: handle.key.clone(),
            profile_name: handle.profile_name.clone(),
            namespace: handle.namespace.clone(),
        }
    }
}

/// Result of [`ClaimTable::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The device was already claimed; its assignment is unchanged.
    Existing(DriverAssignment),
    /// A child device was created with a fresh assignment.
    Created(DriverAssignment),
}

impl Claim {
    /// Returns the assignment.
    #[must_use]
    pub fn assignment(&self) -> &DriverAssignment {
        match self {
            Self::Existing(a) | Self::Created(a) => a,
        }
    }

    /// Returns whether a child device was created.
    #[must_use]
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Changes found by [`ClaimTable::reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Claimed devices that just went missing.
    pub abandoned: Vec<String>,
    /// Abandoned devices that reappeared.
    pub restored: Vec<String>,
}

/// Assignments keyed by IEEE address, plus the abandoned set.
#[derive(Debug, Clone, Default)]
pub struct ClaimTable {
    assignments: BTreeMap<String, DriverAssignment>,
    abandoned: BTreeSet<String>,
}

impl ClaimTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the table from the hub's child devices.
    #[must_use]
    pub fn from_sink(sink: &dyn DeviceSink) -> Self {
        let assignments = sink
            .list_claimed_devices()
            .iter()
            .map(|handle| (handle.key.clone(), DriverAssignment::from(handle)))
            .collect();
        Self {
            assignments,
            abandoned: BTreeSet::new(),
        }
    }

    /// Returns the assignment for `ieee_address`.
    #[must_use]
    pub fn get(&self, ieee_address: &str) -> Option<&DriverAssignment> {
        self.assignments.get(ieee_address)
    }

    /// Returns whether `ieee_address` is claimed.
    #[must_use]
    pub fn is_claimed(&self, ieee_address: &str) -> bool {
        self.assignments.contains_key(ieee_address)
    }

    /// Returns whether `ieee_address` is flagged abandoned.
    #[must_use]
    pub fn is_abandoned(&self, ieee_address: &str) -> bool {
        self.abandoned.contains(ieee_address)
    }

    /// Returns the abandoned IEEE addresses.
    pub fn abandoned(&self) -> impl Iterator<Item = &str> {
        self.abandoned.iter().map(String::as_str)
    }

    /// Returns every assignment.
    pub fn assignments(&self) -> impl Iterator<Item = &DriverAssignment> {
        self.assignments.values()
    }

    /// Returns the number of claimed devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns whether nothing is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Claims `device`, creating its child device on first claim.
    ///
    /// An existing assignment is returned unchanged, whatever the device
    /// declares now.
    pub fn claim(
        &mut self,
        device: &DeviceDescriptor,
        classifier: &CapabilityClassifier,
        sink: &dyn DeviceSink,
    ) -> Claim {
        if let Some(existing) = self.assignments.get(&device.ieee_address) {
            tracing::debug!(
                ieee = %device.ieee_address,
                profile = %existing.profile_name,
                "Device already claimed"
            );
            return Claim::Existing(existing.clone());
        }
        Claim::Created(self.assign(device, classifier, sink))
    }

    /// Reclassifies `device` and replaces its assignment.
    pub fn rematch(
        &mut self,
        device: &DeviceDescriptor,
        classifier: &CapabilityClassifier,
        sink: &dyn DeviceSink,
    ) -> DriverAssignment {
        self.assign(device, classifier, sink)
    }

    /// Flags claimed devices absent from `directory` as abandoned and
    /// clears the flag on those present again.
    pub fn reconcile(&mut self, directory: &DeviceDirectory) -> Reconciliation {
        let mut changes = Reconciliation::default();
        for ieee in self.assignments.keys() {
            let present = directory.contains(ieee);
            if !present && self.abandoned.insert(ieee.clone()) {
                tracing::warn!(ieee = %ieee, "Claimed device missing from directory");
                changes.abandoned.push(ieee.clone());
            } else if present && self.abandoned.remove(ieee) {
                tracing::info!(ieee = %ieee, "Abandoned device is back");
                changes.restored.push(ieee.clone());
            }
        }
        changes
    }

    fn assign(
        &mut self,
        device: &DeviceDescriptor,
        classifier: &CapabilityClassifier,
        sink: &dyn DeviceSink,
    ) -> DriverAssignment {
        let profile = classifier.classify_device(device);
        let handle = sink.create_device(profile, &device.ieee_address, device_properties(device));
        let assignment = DriverAssignment::from(&handle);
        tracing::info!(
            ieee = %device.ieee_address,
            name = %device.friendly_name,
            profile = %assignment.profile_name,
            "Device claimed"
        );
        self.abandoned.remove(&device.ieee_address);
        self.assignments
            .insert(device.ieee_address.clone(), assignment.clone());
        assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{CapabilityDescriptor, DeviceRegistry};
    use crate::sink::MemorySink;

    fn device(ieee: &str, caps: &[&str]) -> DeviceDescriptor {
        DeviceDescriptor::new(
            ieee,
            format!("dev {ieee}"),
            caps.iter().map(|c| CapabilityDescriptor::named(*c)).collect(),
        )
    }

    #[test]
    fn first_claim_creates_device() {
        let sink = MemorySink::new();
        let mut table = ClaimTable::new();
        let claim = table.claim(
            &device("0x01", &["occupancy", "battery"]),
            &CapabilityClassifier::default(),
            &sink,
        );

        assert!(claim.is_created());
        assert_eq!(claim.assignment().profile(), Some(DriverProfile::MotionBattery));
        assert!(sink.find_device_by_key("0x01").is_some());
        assert!(table.is_claimed("0x01"));
    }

    #[test]
    fn reclaim_keeps_assignment_when_exposes_change() {
        let sink = MemorySink::new();
        let classifier = CapabilityClassifier::default();
        let mut table = ClaimTable::new();
        table.claim(&device("0x01", &["contact"]), &classifier, &sink);

        let claim = table.claim(&device("0x01", &["occupancy"]), &classifier, &sink);
        assert!(!claim.is_created());
        assert_eq!(claim.assignment().profile(), Some(DriverProfile::Contact));
        assert_eq!(
            sink.find_device_by_key("0x01").unwrap().profile_name,
            DriverProfile::Contact.name()
        );
    }

    #[test]
    fn rematch_replaces_assignment() {
        let sink = MemorySink::new();
        let classifier = CapabilityClassifier::default();
        let mut table = ClaimTable::new();
        table.claim(&device("0x01", &["contact"]), &classifier, &sink);

        let assignment = table.rematch(&device("0x01", &["occupancy"]), &classifier, &sink);
        assert_eq!(assignment.profile(), Some(DriverProfile::Motion));
        assert_eq!(table.get("0x01"), Some(&assignment));
    }

    #[test]
    fn rebuilt_from_sink() {
        let sink = MemorySink::new();
        sink.create_device(DriverProfile::Rgb, "0x0a", BTreeMap::new());
        sink.create_device(DriverProfile::Button, "0x0b", BTreeMap::new());

        let table = ClaimTable::from_sink(&sink);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("0x0b").unwrap().profile(), Some(DriverProfile::Button));
    }

    #[test]
    fn unknown_driver_has_no_profile() {
        let assignment = DriverAssignment {
            ieee_address: "0x01".to_string(),
            profile_name: "Custom Thing".to_string(),
            namespace: "someone".to_string(),
        };
        assert_eq!(assignment.profile(), None);
    }

    #[test]
    fn reconcile_flags_and_restores() {
        let sink = MemorySink::new();
        let classifier = CapabilityClassifier::default();
        let registry = DeviceRegistry::new();
        let mut table = ClaimTable::new();
        table.claim(&device("0x01", &["contact"]), &classifier, &sink);
        table.claim(&device("0x02", &["state"]), &classifier, &sink);

        let snapshot = registry.replace_devices(vec![device("0x01", &["contact"])]);
        let changes = table.reconcile(&snapshot);
        assert_eq!(changes.abandoned, vec!["0x02".to_string()]);
        assert!(table.is_abandoned("0x02"));
        assert!(table.is_claimed("0x02"));

        // Still missing: not reported twice.
        let changes = table.reconcile(&snapshot);
        assert!(changes.abandoned.is_empty());

        let snapshot = registry.replace_devices(vec![
            device("0x01", &["contact"]),
            device("0x02", &["state"]),
        ]);
        let changes = table.reconcile(&snapshot);
        assert_eq!(changes.restored, vec!["0x02".to_string()]);
        assert_eq!(table.abandoned().count(), 0);
    }
}
