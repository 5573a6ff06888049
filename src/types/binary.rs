// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Two-valued attribute states reported by Zigbee devices.
//!
//! Zigbee2MQTT reports most binary sensors as JSON booleans. Each type here
//! fixes the meaning of `true` for one attribute, so that `contact: true`
//! can never be mistaken for "open".

use std::fmt;

/// Switch state of a relay or light.
///
/// # Examples
///
/// ```
/// use z2m_bridge::types::SwitchState;
///
/// assert_eq!(SwitchState::from_payload("ON"), SwitchState::On);
/// assert_eq!(SwitchState::from_payload("TOGGLE"), SwitchState::Off);
/// assert_eq!(SwitchState::On.as_str(), "on");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchState {
    /// Switch is off.
    Off,
    /// Switch is on.
    On,
}

impl SwitchState {
    /// Interprets a Zigbee2MQTT `state` value. Only the exact string `ON`
    /// means on.
    #[must_use]
    pub fn from_payload(value: &str) -> Self {
        if value == "ON" { Self::On } else { Self::Off }
    }

    /// Returns the hub attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

impl From<bool> for SwitchState {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

/// Contact sensor state. Zigbee2MQTT reports `contact: true` when the
/// magnet is present, i.e. the door is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactState {
    /// Contact is open.
    Open,
    /// Contact is closed.
    Closed,
}

impl ContactState {
    /// Returns the hub attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl From<bool> for ContactState {
    fn from(contact: bool) -> Self {
        if contact { Self::Closed } else { Self::Open }
    }
}

/// Activity state used by motion (`occupancy`) and acceleration (`moving`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityState {
    /// No activity.
    Inactive,
    /// Activity detected.
    Active,
}

impl ActivityState {
    /// Returns the hub attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
        }
    }
}

impl From<bool> for ActivityState {
    fn from(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }
}

/// Water leak sensor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaterState {
    /// No water detected.
    Dry,
    /// Water detected.
    Wet,
}

impl WaterState {
    /// Returns the hub attribute value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dry => "dry",
            Self::Wet => "wet",
        }
    }
}

impl From<bool> for WaterState {
    fn from(leak: bool) -> Self {
        if leak { Self::Wet } else { Self::Dry }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(SwitchState, ContactState, ActivityState, WaterState);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_only_exact_on_is_on() {
        assert_eq!(SwitchState::from_payload("ON"), SwitchState::On);
        assert_eq!(SwitchState::from_payload("on"), SwitchState::Off);
        assert_eq!(SwitchState::from_payload("OFF"), SwitchState::Off);
        assert_eq!(SwitchState::from_payload(""), SwitchState::Off);
    }

    #[test]
    fn contact_true_is_closed() {
        assert_eq!(ContactState::from(true), ContactState::Closed);
        assert_eq!(ContactState::from(false), ContactState::Open);
    }

    #[test]
    fn water_leak_true_is_wet() {
        assert_eq!(WaterState::from(true).to_string(), "wet");
        assert_eq!(WaterState::from(false).to_string(), "dry");
    }

    #[test]
    fn activity_display() {
        assert_eq!(ActivityState::from(true).to_string(), "active");
        assert_eq!(ActivityState::from(false).to_string(), "inactive");
    }
}
