// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Driver selection from declared capabilities.
//!
//! A device's `exposes` list is reduced to a [`CapabilitySet`] and matched
//! against an ordered list of [`Rule`]s. The first rule whose predicate
//! holds decides the [`DriverProfile`]. Devices matching no rule get
//! [`DriverProfile::Generic`].
//!
//! # Examples
//!
//! ```
//! use z2m_bridge::classify::{CapabilityClassifier, DriverProfile};
//! use z2m_bridge::directory::CapabilityDescriptor;
//!
//! let exposes = vec![
//!     CapabilityDescriptor::named("temperature"),
//!     CapabilityDescriptor::named("occupancy"),
//!     CapabilityDescriptor::named("humidity"),
//! ];
//!
//! let classifier = CapabilityClassifier::default();
//! assert_eq!(classifier.classify(&exposes), DriverProfile::MotionTemperatureHumidity);
//! ```

mod profile;

pub use profile::{BRIDGE_NAMESPACE, DriverProfile, HUB_NAMESPACE};

use std::collections::HashSet;

use crate::directory::{CapabilityDescriptor, DeviceDescriptor};

/// Names of the color features a light composite can carry.
const COLOR_FEATURES: [&str; 2] = ["color_xy", "color_hs"];

/// Name of the color temperature feature of a light composite.
const COLOR_TEMP_FEATURE: &str = "color_temp";

/// Flattened view of a device's `exposes` list.
///
/// Membership queries are independent of declaration order.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet<'a> {
    top_level: HashSet<&'a str>,
    nested: HashSet<&'a str>,
    composites: Vec<HashSet<&'a str>>,
}

impl<'a> CapabilitySet<'a> {
    /// Builds the set from an `exposes` list.
    #[must_use]
    pub fn new(exposes: &'a [CapabilityDescriptor]) -> Self {
        let mut set = Self::default();
        for cap in exposes {
            if !cap.name.is_empty() {
                set.top_level.insert(cap.name.as_str());
            }
            if !cap.features.is_empty() {
                let features: HashSet<&str> =
                    cap.features.iter().map(|f| f.name.as_str()).collect();
                set.nested.extend(features.iter().copied());
                set.composites.push(features);
            }
        }
        set
    }

    /// Returns whether a top-level capability with `name` is declared.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.top_level.contains(name)
    }

    /// Returns whether `name` is declared at any level.
    #[must_use]
    pub fn has_anywhere(&self, name: &str) -> bool {
        self.top_level.contains(name) || self.nested.contains(name)
    }

    /// Returns whether any accelerometer axis (`x_axis`, ...) is declared.
    #[must_use]
    pub fn has_axis(&self) -> bool {
        self.top_level
            .iter()
            .chain(self.nested.iter())
            .any(|name| name.ends_with("_axis"))
    }

    /// Returns whether a composite declares an XY or HS color feature.
    #[must_use]
    pub fn has_color(&self) -> bool {
        self.composites.iter().any(has_color_feature)
    }

    /// Returns whether a composite declares a color temperature feature.
    #[must_use]
    pub fn has_color_temp(&self) -> bool {
        self.composites
            .iter()
            .any(|features| features.contains(COLOR_TEMP_FEATURE))
    }

    /// Returns whether a single composite declares both color and color
    /// temperature.
    #[must_use]
    pub fn has_color_and_temp(&self) -> bool {
        self.composites
            .iter()
            .any(|features| has_color_feature(features) && features.contains(COLOR_TEMP_FEATURE))
    }
}

fn has_color_feature(features: &HashSet<&str>) -> bool {
    COLOR_FEATURES.iter().any(|name| features.contains(name))
}

/// A predicate paired with the profile it selects.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Short identifier, used in logs and tests.
    pub name: &'static str,
    /// Predicate over the flattened capability set.
    pub matches: fn(&CapabilitySet<'_>) -> bool,
    /// Profile selected when the predicate holds.
    pub profile: DriverProfile,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

/// Built-in rules, highest priority first.
pub const STANDARD_RULES: &[Rule] = &[
    Rule {
        name: "motion_temperature_humidity",
        matches: |c| c.has("occupancy") && c.has("temperature") && c.has("humidity"),
        profile: DriverProfile::MotionTemperatureHumidity,
    },
    Rule {
        name: "motion_temperature_illuminance",
        matches: |c| c.has("occupancy") && c.has("temperature") && c.has("illuminance_lux"),
        profile: DriverProfile::MotionTemperatureIlluminance,
    },
    Rule {
        name: "motion_temperature",
        matches: |c| c.has("occupancy") && c.has("temperature"),
        profile: DriverProfile::MotionTemperature,
    },
    Rule {
        name: "motion_battery",
        matches: |c| c.has("occupancy") && c.has("battery"),
        profile: DriverProfile::MotionBattery,
    },
    Rule {
        name: "motion",
        matches: |c| c.has("occupancy"),
        profile: DriverProfile::Motion,
    },
    Rule {
        name: "contact_acceleration",
        matches: |c| c.has("contact") && c.has_axis(),
        profile: DriverProfile::ContactAcceleration,
    },
    Rule {
        name: "contact_battery",
        matches: |c| c.has("contact") && c.has("battery"),
        profile: DriverProfile::ContactBattery,
    },
    Rule {
        name: "contact",
        matches: |c| c.has("contact"),
        profile: DriverProfile::Contact,
    },
    Rule {
        name: "temperature_humidity",
        matches: |c| c.has("temperature"),
        profile: DriverProfile::TemperatureHumidity,
    },
    Rule {
        name: "rgbw_effects",
        matches: |c| c.has_color_and_temp() && c.has_anywhere("effect"),
        profile: DriverProfile::RgbwEffects,
    },
    Rule {
        name: "rgbw",
        matches: |c| c.has_color_and_temp(),
        profile: DriverProfile::Rgbw,
    },
    Rule {
        name: "rgb",
        matches: |c| c.has_color(),
        profile: DriverProfile::Rgb,
    },
    Rule {
        name: "color_temperature",
        matches: |c| c.has_color_temp(),
        profile: DriverProfile::ColorTemperature,
    },
    Rule {
        name: "button",
        matches: |c| c.has("action"),
        profile: DriverProfile::Button,
    },
    Rule {
        name: "switch",
        matches: |c| c.has_anywhere("state"),
        profile: DriverProfile::Switch,
    },
    Rule {
        name: "water_leak",
        matches: |c| c.has("water_leak"),
        profile: DriverProfile::WaterLeak,
    },
];

/// Picks a driver profile for a device.
#[derive(Debug, Clone)]
pub struct CapabilityClassifier {
    rules: Vec<Rule>,
}

impl Default for CapabilityClassifier {
    fn default() -> Self {
        Self::new(STANDARD_RULES.to_vec())
    }
}

impl CapabilityClassifier {
    /// Creates a classifier over `rules`, evaluated in order.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Inserts `rule` ahead of the rule named `before`.
    ///
    /// Appends when no rule has that name.
    #[must_use]
    pub fn with_rule_before(mut self, before: &str, rule: Rule) -> Self {
        let index = self
            .rules
            .iter()
            .position(|r| r.name == before)
            .unwrap_or(self.rules.len());
        self.rules.insert(index, rule);
        self
    }

    /// Returns the rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the first rule matching `exposes`, if any.
    #[must_use]
    pub fn matching_rule(&self, exposes: &[CapabilityDescriptor]) -> Option<&Rule> {
        let caps = CapabilitySet::new(exposes);
        self.rules.iter().find(|rule| (rule.matches)(&caps))
    }

    /// Returns the profile for `exposes`.
    #[must_use]
    pub fn classify(&self, exposes: &[CapabilityDescriptor]) -> DriverProfile {
        self.matching_rule(exposes)
            .map_or(DriverProfile::Generic, |rule| rule.profile)
    }

    /// Returns the profile for a directory entry.
    #[must_use]
    pub fn classify_device(&self, device: &DeviceDescriptor) -> DriverProfile {
        let profile = self.classify(&device.exposes);
        if profile == DriverProfile::Generic {
            tracing::debug!(
                ieee = %device.ieee_address,
                "No capability rule matched, using passthrough profile"
            );
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(names: &[&str]) -> Vec<CapabilityDescriptor> {
        names.iter().map(|n| CapabilityDescriptor::named(*n)).collect()
    }

    fn light(features: &[&str]) -> CapabilityDescriptor {
        CapabilityDescriptor::composite("light", named(features))
    }

    fn classify(exposes: &[CapabilityDescriptor]) -> DriverProfile {
        CapabilityClassifier::default().classify(exposes)
    }

    #[test]
    fn motion_rules() {
        assert_eq!(
            classify(&named(&["occupancy", "temperature", "humidity", "illuminance_lux"])),
            DriverProfile::MotionTemperatureHumidity
        );
        assert_eq!(
            classify(&named(&["occupancy", "temperature", "illuminance_lux"])),
            DriverProfile::MotionTemperatureIlluminance
        );
        assert_eq!(
            classify(&named(&["occupancy", "temperature", "battery"])),
            DriverProfile::MotionTemperature
        );
        assert_eq!(
            classify(&named(&["occupancy", "battery", "linkquality"])),
            DriverProfile::MotionBattery
        );
        assert_eq!(classify(&named(&["occupancy"])), DriverProfile::Motion);
    }

    #[test]
    fn contact_rules() {
        assert_eq!(
            classify(&named(&["contact", "battery", "x_axis", "y_axis", "z_axis"])),
            DriverProfile::ContactAcceleration
        );
        assert_eq!(
            classify(&named(&["contact", "battery"])),
            DriverProfile::ContactBattery
        );
        assert_eq!(classify(&named(&["contact"])), DriverProfile::Contact);
    }

    #[test]
    fn occupancy_wins_over_contact() {
        assert_eq!(
            classify(&named(&["contact", "occupancy"])),
            DriverProfile::Motion
        );
    }

    #[test]
    fn temperature_without_motion_or_contact() {
        assert_eq!(
            classify(&named(&["temperature", "humidity", "pressure"])),
            DriverProfile::TemperatureHumidity
        );
        assert_eq!(
            classify(&named(&["temperature"])),
            DriverProfile::TemperatureHumidity
        );
    }

    #[test]
    fn light_rules() {
        let full = vec![
            light(&["state", "brightness", "color_temp", "color_xy"]),
            CapabilityDescriptor::named("effect"),
        ];
        assert_eq!(classify(&full), DriverProfile::RgbwEffects);

        let rgbw = vec![light(&["state", "brightness", "color_temp", "color_hs"])];
        assert_eq!(classify(&rgbw), DriverProfile::Rgbw);

        let rgb = vec![light(&["state", "brightness", "color_xy"])];
        assert_eq!(classify(&rgb), DriverProfile::Rgb);

        let ct = vec![light(&["state", "brightness", "color_temp"])];
        assert_eq!(classify(&ct), DriverProfile::ColorTemperature);
    }

    #[test]
    fn color_and_temperature_must_share_a_composite() {
        let split = vec![light(&["state", "color_xy"]), light(&["state", "color_temp"])];
        assert_eq!(classify(&split), DriverProfile::Rgb);
    }

    #[test]
    fn color_without_composite_does_not_match_light_rules() {
        assert_eq!(
            classify(&named(&["color_xy", "color_temp"])),
            DriverProfile::Generic
        );
    }

    #[test]
    fn button_rule() {
        assert_eq!(
            classify(&named(&["action", "battery", "linkquality"])),
            DriverProfile::Button
        );
    }

    #[test]
    fn switch_rule_sees_nested_state() {
        let plug = vec![
            CapabilityDescriptor::composite("switch", named(&["state"])),
            CapabilityDescriptor::named("power"),
        ];
        assert_eq!(classify(&plug), DriverProfile::Switch);
        assert_eq!(classify(&named(&["state"])), DriverProfile::Switch);
    }

    #[test]
    fn dimmer_without_color_is_a_switch() {
        let dimmer = vec![light(&["state", "brightness"])];
        assert_eq!(classify(&dimmer), DriverProfile::Switch);
    }

    #[test]
    fn water_leak_rule() {
        assert_eq!(
            classify(&named(&["water_leak", "battery"])),
            DriverProfile::WaterLeak
        );
    }

    #[test]
    fn unknown_capabilities_fall_back() {
        assert_eq!(classify(&named(&["pressure", "co2"])), DriverProfile::Generic);
        assert_eq!(classify(&[]), DriverProfile::Generic);
    }

    #[test]
    fn classification_is_order_independent() {
        let orders = [
            ["occupancy", "temperature", "humidity"],
            ["humidity", "occupancy", "temperature"],
            ["temperature", "humidity", "occupancy"],
        ];
        for order in orders {
            assert_eq!(
                classify(&named(&order)),
                DriverProfile::MotionTemperatureHumidity
            );
        }
    }

    #[test]
    fn every_standard_rule_is_reachable() {
        let cases: Vec<Vec<CapabilityDescriptor>> = vec![
            named(&["occupancy", "temperature", "humidity"]),
            named(&["occupancy", "temperature", "illuminance_lux"]),
            named(&["occupancy", "temperature"]),
            named(&["occupancy", "battery"]),
            named(&["occupancy"]),
            named(&["contact", "x_axis"]),
            named(&["contact", "battery"]),
            named(&["contact"]),
            named(&["temperature"]),
            vec![light(&["color_xy", "color_temp"]), CapabilityDescriptor::named("effect")],
            vec![light(&["color_xy", "color_temp"])],
            vec![light(&["color_hs"])],
            vec![light(&["color_temp"])],
            named(&["action"]),
            named(&["state"]),
            named(&["water_leak"]),
        ];
        let classifier = CapabilityClassifier::default();
        for (rule, exposes) in STANDARD_RULES.iter().zip(&cases) {
            let matched = classifier.matching_rule(exposes).map(|r| r.name);
            assert_eq!(matched, Some(rule.name));
        }
    }

    #[test]
    fn inserted_rule_takes_priority() {
        let classifier = CapabilityClassifier::default().with_rule_before(
            "switch",
            Rule {
                name: "leak_first",
                matches: |c| c.has("water_leak"),
                profile: DriverProfile::WaterLeak,
            },
        );
        assert_eq!(
            classifier.classify(&named(&["state", "water_leak"])),
            DriverProfile::WaterLeak
        );
        assert_eq!(
            CapabilityClassifier::default().classify(&named(&["state", "water_leak"])),
            DriverProfile::Switch
        );
    }
}
