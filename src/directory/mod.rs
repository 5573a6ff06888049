// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The Zigbee2MQTT device and group directory.
//!
//! Zigbee2MQTT publishes its full device list (retained) on
//! `<base>/bridge/devices` and its groups on `<base>/bridge/groups`. This
//! module parses those payloads and keeps the latest of each as an atomic
//! snapshot in a [`DeviceRegistry`].

mod descriptor;
mod registry;

pub use descriptor::{
    CapabilityDescriptor, DeviceDescriptor, DeviceType, GroupDescriptor, GroupMember,
    parse_devices, parse_groups,
};
pub use registry::{DeviceDirectory, DeviceRegistry, GroupDirectory};
