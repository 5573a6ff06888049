// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Temperature scales and unit conversion.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A temperature scale.
///
/// Devices declare their native scale through the unit of their
/// `temperature` capability; the hub has a single locale scale. Readings
/// are converted from the former to the latter.
///
/// # Examples
///
/// ```
/// use z2m_bridge::types::TemperatureScale;
///
/// let f = TemperatureScale::Celsius.convert(21.0, TemperatureScale::Fahrenheit);
/// assert!((f - 69.8).abs() < f64::EPSILON);
///
/// assert_eq!(TemperatureScale::from_unit("°F"), Some(TemperatureScale::Fahrenheit));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemperatureScale {
    /// Degrees Celsius.
    #[default]
    Celsius,
    /// Degrees Fahrenheit.
    Fahrenheit,
}

impl TemperatureScale {
    /// Parses a unit string as declared in a device's exposes list.
    ///
    /// Accepts `°C`, `C`, `°F` and `F` (case-insensitive). Returns `None` for
    /// anything else.
    #[must_use]
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit.trim().trim_start_matches('°').to_ascii_uppercase().as_str() {
            "C" => Some(Self::Celsius),
            "F" => Some(Self::Fahrenheit),
            _ => None,
        }
    }

    /// Returns the unit symbol used in attribute events.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Converts `value` from this scale into `target`, rounded to one
    /// decimal place (half-up).
    #[must_use]
    pub fn convert(self, value: f64, target: Self) -> f64 {
        let converted = match (self, target) {
            (Self::Celsius, Self::Fahrenheit) => value * 9.0 / 5.0 + 32.0,
            (Self::Fahrenheit, Self::Celsius) => (value - 32.0) * 5.0 / 9.0,
            _ => value,
        };
        round_tenths(converted)
    }
}

/// Rounds to one decimal place, ties towards positive infinity.
#[must_use]
pub fn round_tenths(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

impl fmt::Display for TemperatureScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for TemperatureScale {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_unit(s).ok_or_else(|| ConfigError::InvalidSetting {
            key: "temperature_scale".to_string(),
            value: s.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_unit_variants() {
        assert_eq!(TemperatureScale::from_unit("°C"), Some(TemperatureScale::Celsius));
        assert_eq!(TemperatureScale::from_unit("c"), Some(TemperatureScale::Celsius));
        assert_eq!(TemperatureScale::from_unit("F"), Some(TemperatureScale::Fahrenheit));
        assert_eq!(TemperatureScale::from_unit("K"), None);
        assert_eq!(TemperatureScale::from_unit("%"), None);
    }

    #[test]
    fn convert_celsius_to_fahrenheit() {
        let value = TemperatureScale::Celsius.convert(22.5, TemperatureScale::Fahrenheit);
        assert!((value - 72.5).abs() < 1e-9);
    }

    #[test]
    fn convert_fahrenheit_to_celsius_rounds() {
        // 70°F = 21.111..°C
        let value = TemperatureScale::Fahrenheit.convert(70.0, TemperatureScale::Celsius);
        assert!((value - 21.1).abs() < 1e-9);
    }

    #[test]
    fn same_scale_only_rounds() {
        let value = TemperatureScale::Celsius.convert(19.87, TemperatureScale::Celsius);
        assert!((value - 19.9).abs() < 1e-9);
    }

    #[test]
    fn round_tenths_half_up() {
        assert!((round_tenths(21.25) - 21.3).abs() < 1e-9);
        assert!((round_tenths(21.24) - 21.2).abs() < 1e-9);
        assert!((round_tenths(-0.25) - -0.2).abs() < 1e-9);
    }

    #[test]
    fn parse_setting() {
        assert_eq!("F".parse::<TemperatureScale>(), Ok(TemperatureScale::Fahrenheit));
        assert!("kelvin".parse::<TemperatureScale>().is_err());
    }
}
