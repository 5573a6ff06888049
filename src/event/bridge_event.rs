// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bridge event types.

use chrono::{DateTime, Utc};

use crate::classify::DriverProfile;
use crate::session::ConnectionState;
use crate::translate::AttributeEvent;

/// Events emitted by a bridge session.
///
/// Every event records the time it was raised.
///
/// # Examples
///
/// ```
/// use z2m_bridge::event::BridgeEvent;
///
/// let event = BridgeEvent::device_abandoned("0x00158d0001a2b3c4");
/// assert_eq!(event.ieee_address(), Some("0x00158d0001a2b3c4"));
/// assert!(event.is_directory());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// The broker session changed state.
    ConnectionChanged {
        /// The session identifier.
        session_id: String,
        /// The new state.
        state: ConnectionState,
        /// When the change was observed.
        at: DateTime<Utc>,
    },

    /// A `bridge/devices` message replaced the device directory.
    DirectoryRefreshed {
        /// Generation of the new snapshot.
        generation: u64,
        /// Number of devices, coordinator excluded.
        devices: usize,
        /// When the snapshot was installed.
        at: DateTime<Utc>,
    },

    /// A device received a driver assignment.
    DeviceClaimed {
        /// IEEE address of the device.
        ieee_address: String,
        /// The assigned profile.
        profile: DriverProfile,
        /// When the device was claimed.
        at: DateTime<Utc>,
    },

    /// A claimed device is missing from the latest directory.
    DeviceAbandoned {
        /// IEEE address of the device.
        ieee_address: String,
        /// When the device was flagged.
        at: DateTime<Utc>,
    },

    /// Attribute events were delivered to a device.
    AttributesEmitted {
        /// Device key (IEEE address).
        device_key: String,
        /// The delivered events, in emission order.
        events: Vec<AttributeEvent>,
        /// When the events were delivered.
        at: DateTime<Utc>,
    },
}

impl BridgeEvent {
    /// Creates a connection change event stamped now.
    #[must_use]
    pub fn connection_changed(session_id: impl Into<String>, state: ConnectionState) -> Self {
        Self::ConnectionChanged {
            session_id: session_id.into(),
            state,
            at: Utc::now(),
        }
    }

    /// Creates a directory refresh event stamped now.
    #[must_use]
    pub fn directory_refreshed(generation: u64, devices: usize) -> Self {
        Self::DirectoryRefreshed {
            generation,
            devices,
            at: Utc::now(),
        }
    }

    /// Creates a claim event stamped now.
    #[must_use]
    pub fn device_claimed(ieee_address: impl Into<String>, profile: DriverProfile) -> Self {
        Self::DeviceClaimed {
            ieee_address: ieee_address.into(),
            profile,
            at: Utc::now(),
        }
    }

    /// Creates an abandonment event stamped now.
    #[must_use]
    pub fn device_abandoned(ieee_address: impl Into<String>) -> Self {
        Self::DeviceAbandoned {
            ieee_address: ieee_address.into(),
            at: Utc::now(),
        }
    }

    /// Creates an attribute delivery event stamped now.
    #[must_use]
    pub fn attributes_emitted(device_key: impl Into<String>, events: Vec<AttributeEvent>) -> Self {
        Self::AttributesEmitted {
            device_key: device_key.into(),
            events,
            at: Utc::now(),
        }
    }

    /// Returns when the event was raised.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ConnectionChanged { at, .. }
            | Self::DirectoryRefreshed { at, .. }
            | Self::DeviceClaimed { at, .. }
            | Self::DeviceAbandoned { at, .. }
            | Self::AttributesEmitted { at, .. } => *at,
        }
    }

    /// Returns the IEEE address the event concerns, if any.
    #[must_use]
    pub fn ieee_address(&self) -> Option<&str> {
        match self {
            Self::DeviceClaimed { ieee_address, .. } | Self::DeviceAbandoned { ieee_address, .. } => {
                Some(ieee_address)
            }
            Self::AttributesEmitted { device_key, .. } => Some(device_key),
            Self::ConnectionChanged { .. } | Self::DirectoryRefreshed { .. } => None,
        }
    }

    /// Returns `true` if this is a connection event.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionChanged { .. })
    }

    /// Returns `true` if this event concerns the directory or claims.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            Self::DirectoryRefreshed { .. }
                | Self::DeviceClaimed { .. }
                | Self::DeviceAbandoned { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Attribute;

    #[test]
    fn constructors_stamp_current_time() {
        let before = Utc::now();
        let event = BridgeEvent::directory_refreshed(3, 12);
        assert!(event.timestamp() >= before);
        assert!(event.timestamp() <= Utc::now());
    }

    #[test]
    fn ieee_address_of_device_events() {
        let claimed = BridgeEvent::device_claimed("0x01", DriverProfile::Switch);
        assert_eq!(claimed.ieee_address(), Some("0x01"));

        let emitted = BridgeEvent::attributes_emitted(
            "0x02",
            vec![AttributeEvent::new(Attribute::Switch(crate::types::SwitchState::On))],
        );
        assert_eq!(emitted.ieee_address(), Some("0x02"));

        let refreshed = BridgeEvent::directory_refreshed(1, 0);
        assert_eq!(refreshed.ieee_address(), None);
    }

    #[test]
    fn event_categories() {
        let conn = BridgeEvent::connection_changed("s1", ConnectionState::Connected);
        assert!(conn.is_connection());
        assert!(!conn.is_directory());

        let claimed = BridgeEvent::device_claimed("0x01", DriverProfile::Contact);
        assert!(claimed.is_directory());
        assert!(!claimed.is_connection());
    }
}
