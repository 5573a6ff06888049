// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Color conversions and generic color names.
//!
//! Zigbee2MQTT reports color temperature in mireds and hue in degrees. The
//! hub expects Kelvin and hue as a percentage, plus a coarse human-readable
//! color name derived from either.

/// Converts a color temperature in mireds to Kelvin, rounded to the nearest
/// integer. Returns `None` for non-positive input.
///
/// # Examples
///
/// ```
/// use z2m_bridge::types::mireds_to_kelvin;
///
/// assert_eq!(mireds_to_kelvin(370.0), Some(2703));
/// assert_eq!(mireds_to_kelvin(0.0), None);
/// ```
#[must_use]
pub fn mireds_to_kelvin(mireds: f64) -> Option<u32> {
    if mireds <= 0.0 || !mireds.is_finite() {
        return None;
    }
    // Bounded: mireds > 0 and Zigbee reports at least 1, so this fits in u32.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let kelvin = (1_000_000.0 / mireds).round() as u32;
    Some(kelvin)
}

/// Converts a hue in degrees to the hub's percentage scale. Values outside
/// 0-360 are clamped.
#[must_use]
pub fn hue_degrees_to_percent(degrees: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = (degrees.clamp(0.0, 360.0) / 3.6).round() as u8;
    percent
}

/// Upper bounds (inclusive, degrees) of each named hue range.
const HUE_NAMES: [(f64, &str); 12] = [
    (15.0, "Red"),
    (45.0, "Orange"),
    (75.0, "Yellow"),
    (105.0, "Chartreuse"),
    (135.0, "Green"),
    (165.0, "Spring"),
    (195.0, "Cyan"),
    (225.0, "Azure"),
    (255.0, "Blue"),
    (285.0, "Violet"),
    (315.0, "Magenta"),
    (345.0, "Rose"),
];

/// Returns the generic color name for a hue (degrees, wrapped into 0-360)
/// and saturation (percent).
///
/// A saturation below 1% is white regardless of hue.
///
/// # Examples
///
/// ```
/// use z2m_bridge::types::generic_color_name;
///
/// assert_eq!(generic_color_name(240.0, 100.0), "Blue");
/// assert_eq!(generic_color_name(359.0, 80.0), "Red");
/// assert_eq!(generic_color_name(120.0, 0.5), "White");
/// ```
#[must_use]
pub fn generic_color_name(hue_degrees: f64, saturation: f64) -> &'static str {
    if saturation < 1.0 {
        return "White";
    }
    let hue = hue_degrees.rem_euclid(360.0);
    HUE_NAMES
        .iter()
        .find(|(upper, _)| hue <= *upper)
        .map_or("Red", |(_, name)| name)
}

/// Returns the generic name of a white color temperature in Kelvin.
///
/// # Examples
///
/// ```
/// use z2m_bridge::types::color_temperature_name;
///
/// assert_eq!(color_temperature_name(2703), "Incandescent");
/// assert_eq!(color_temperature_name(25_000), "undefined");
/// ```
#[must_use]
pub fn color_temperature_name(kelvin: u32) -> &'static str {
    match kelvin {
        0..=2000 => "Sodium",
        2001..=2100 => "Starlight",
        2101..=2399 => "Sunrise",
        2400..=2799 => "Incandescent",
        2800..=3299 => "Soft White",
        3300..=3499 => "Warm White",
        3500..=4149 => "Moonlight",
        4150..=5000 => "Horizon",
        5001..=5499 => "Daylight",
        5500..=5999 => "Electronic",
        6000..=6500 => "Skylight",
        6501..=19_999 => "Polar",
        _ => "undefined",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mireds_conversion_rounds() {
        assert_eq!(mireds_to_kelvin(370.0), Some(2703));
        assert_eq!(mireds_to_kelvin(153.0), Some(6536));
        assert_eq!(mireds_to_kelvin(500.0), Some(2000));
        assert_eq!(mireds_to_kelvin(-5.0), None);
    }

    #[test]
    fn hue_percent() {
        assert_eq!(hue_degrees_to_percent(0.0), 0);
        assert_eq!(hue_degrees_to_percent(180.0), 50);
        assert_eq!(hue_degrees_to_percent(359.0), 100);
        assert_eq!(hue_degrees_to_percent(360.0), 100);
        assert_eq!(hue_degrees_to_percent(400.0), 100);
        assert_eq!(hue_degrees_to_percent(-10.0), 0);
    }

    #[test]
    fn color_name_boundaries() {
        assert_eq!(generic_color_name(0.0, 100.0), "Red");
        assert_eq!(generic_color_name(15.0, 100.0), "Red");
        assert_eq!(generic_color_name(16.0, 100.0), "Orange");
        assert_eq!(generic_color_name(60.0, 100.0), "Yellow");
        assert_eq!(generic_color_name(90.0, 100.0), "Chartreuse");
        assert_eq!(generic_color_name(120.0, 100.0), "Green");
        assert_eq!(generic_color_name(150.0, 100.0), "Spring");
        assert_eq!(generic_color_name(180.0, 100.0), "Cyan");
        assert_eq!(generic_color_name(210.0, 100.0), "Azure");
        assert_eq!(generic_color_name(270.0, 100.0), "Violet");
        assert_eq!(generic_color_name(300.0, 100.0), "Magenta");
        assert_eq!(generic_color_name(330.0, 100.0), "Rose");
        assert_eq!(generic_color_name(346.0, 100.0), "Red");
    }

    #[test]
    fn color_name_wraps_hue() {
        assert_eq!(generic_color_name(480.0, 100.0), "Green");
        assert_eq!(generic_color_name(-120.0, 100.0), "Blue");
    }

    #[test]
    fn low_saturation_is_white() {
        assert_eq!(generic_color_name(240.0, 0.0), "White");
        assert_eq!(generic_color_name(240.0, 1.0), "Blue");
    }

    #[test]
    fn color_temperature_names() {
        assert_eq!(color_temperature_name(2000), "Sodium");
        assert_eq!(color_temperature_name(2050), "Starlight");
        assert_eq!(color_temperature_name(2200), "Sunrise");
        assert_eq!(color_temperature_name(3000), "Soft White");
        assert_eq!(color_temperature_name(3400), "Warm White");
        assert_eq!(color_temperature_name(4000), "Moonlight");
        assert_eq!(color_temperature_name(5000), "Horizon");
        assert_eq!(color_temperature_name(5200), "Daylight");
        assert_eq!(color_temperature_name(5800), "Electronic");
        assert_eq!(color_temperature_name(6500), "Skylight");
        assert_eq!(color_temperature_name(19_999), "Polar");
        assert_eq!(color_temperature_name(20_000), "undefined");
    }
}
