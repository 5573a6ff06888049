// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver profiles a Zigbee device can be assigned to.

use std::fmt;

/// Namespace of the hub's built-in component drivers.
pub const HUB_NAMESPACE: &str = "hubitat";

/// Namespace of the drivers shipped with this bridge.
pub const BRIDGE_NAMESPACE: &str = "zigbee2mqtt";

/// A hub driver profile, identified by name and namespace.
///
/// # Examples
///
/// ```
/// use z2m_bridge::classify::DriverProfile;
///
/// let profile = DriverProfile::Rgbw;
/// assert_eq!(profile.name(), "Generic Component RGBW");
/// assert_eq!(profile.namespace(), "hubitat");
/// assert_eq!(DriverProfile::from_parts(profile.name(), profile.namespace()), Some(profile));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverProfile {
    /// Motion sensor with temperature and humidity.
    MotionTemperatureHumidity,
    /// Motion sensor with temperature and illuminance.
    MotionTemperatureIlluminance,
    /// Motion sensor with temperature.
    MotionTemperature,
    /// Battery-powered motion sensor.
    MotionBattery,
    /// Plain motion sensor.
    Motion,
    /// Contact sensor with accelerometer.
    ContactAcceleration,
    /// Battery-powered contact sensor.
    ContactBattery,
    /// Plain contact sensor.
    Contact,
    /// Temperature and humidity sensor.
    TemperatureHumidity,
    /// Full-featured color bulb with color temperature and effects.
    RgbwEffects,
    /// Color bulb with color temperature.
    Rgbw,
    /// Color bulb without color temperature.
    Rgb,
    /// Tunable white bulb.
    ColorTemperature,
    /// Button or remote emitting actions.
    Button,
    /// On/off switch.
    Switch,
    /// Water leak sensor.
    WaterLeak,
    /// Passthrough profile for anything else.
    Generic,
}

impl DriverProfile {
    /// All profiles.
    pub const ALL: [Self; 17] = [
        Self::MotionTemperatureHumidity,
        Self::MotionTemperatureIlluminance,
        Self::MotionTemperature,
        Self::MotionBattery,
        Self::Motion,
        Self::ContactAcceleration,
        Self::ContactBattery,
        Self::Contact,
        Self::TemperatureHumidity,
        Self::RgbwEffects,
        Self::Rgbw,
        Self::Rgb,
        Self::ColorTemperature,
        Self::Button,
        Self::Switch,
        Self::WaterLeak,
        Self::Generic,
    ];

    /// Returns the driver name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MotionTemperatureHumidity => "Zigbee2MQTT Motion Temperature Humidity Sensor",
            Self::MotionTemperatureIlluminance => "Zigbee2MQTT Motion Temperature Lux Sensor",
            Self::MotionTemperature => "Zigbee2MQTT Motion Temperature Sensor",
            Self::MotionBattery => "Zigbee2MQTT Battery Motion Sensor",
            Self::Motion => "Generic Component Motion Sensor",
            Self::ContactAcceleration => "Zigbee2MQTT Contact Acceleration Sensor",
            Self::ContactBattery => "Zigbee2MQTT Battery Contact Sensor",
            Self::Contact => "Generic Component Contact Sensor",
            Self::TemperatureHumidity => "Zigbee2MQTT Temperature Humidity Sensor",
            Self::RgbwEffects => "Zigbee2MQTT RGBW Bulb with Effects",
            Self::Rgbw => "Generic Component RGBW",
            Self::Rgb => "Generic Component RGB",
            Self::ColorTemperature => "Generic Component CT",
            Self::Button => "Zigbee2MQTT Button Controller",
            Self::Switch => "Generic Component Switch",
            Self::WaterLeak => "Zigbee2MQTT Water Leak Sensor",
            Self::Generic => "Zigbee2MQTT Generic Device",
        }
    }

    /// Returns the driver namespace.
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        match self {
            Self::Motion | Self::Contact | Self::Rgbw | Self::Rgb | Self::ColorTemperature
            | Self::Switch => HUB_NAMESPACE,
            _ => BRIDGE_NAMESPACE,
        }
    }

    /// Looks a profile up by name and namespace.
    #[must_use]
    pub fn from_parts(name: &str, namespace: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == name && p.namespace() == namespace)
    }
}

impl fmt::Display for DriverProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = DriverProfile::ALL.iter().map(DriverProfile::name).collect();
        assert_eq!(names.len(), DriverProfile::ALL.len());
    }

    #[test]
    fn round_trip_through_parts() {
        for profile in DriverProfile::ALL {
            assert_eq!(
                DriverProfile::from_parts(profile.name(), profile.namespace()),
                Some(profile)
            );
        }
        assert_eq!(DriverProfile::from_parts("Generic Component RGBW", BRIDGE_NAMESPACE), None);
    }

    #[test]
    fn display_includes_namespace() {
        assert_eq!(
            DriverProfile::Switch.to_string(),
            "hubitat:Generic Component Switch"
        );
    }
}
