// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Normalized attribute events.
//!
//! An [`AttributeEvent`] is what the hub's device model understands: a named
//! attribute, a value, an optional unit and a description. The set of
//! attributes is closed; each [`Attribute`] variant fixes its hub name and
//! value type.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::types::{ActivityState, ContactState, SwitchState, WaterState};

/// A single attribute value, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// `switch`: on/off.
    Switch(SwitchState),
    /// `level`: brightness in percent.
    Level(u8),
    /// `colorTemperature`: Kelvin.
    ColorTemperature(u32),
    /// `colorName`: generic name derived from hue or color temperature.
    ColorName(&'static str),
    /// `hue`: percent of the color wheel.
    Hue(u8),
    /// `saturation`: percent.
    Saturation(u8),
    /// `battery`: percent.
    Battery(i64),
    /// `contact`: open/closed.
    Contact(ContactState),
    /// `humidity`: relative humidity in percent.
    Humidity(i64),
    /// `illuminance`: lux.
    Illuminance(i64),
    /// `acceleration`: active/inactive.
    Acceleration(ActivityState),
    /// `motion`: active/inactive.
    Motion(ActivityState),
    /// `temperature`: in the hub's locale scale.
    Temperature(f64),
    /// `water`: wet/dry.
    Water(WaterState),
    /// `threeAxis`: partial map of axis letter to reading.
    ThreeAxis(BTreeMap<char, f64>),
    /// `action`: raw device action, mapped downstream per device.
    Action(String),
}

impl Attribute {
    /// Returns the hub attribute name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Switch(_) => "switch",
            Self::Level(_) => "level",
            Self::ColorTemperature(_) => "colorTemperature",
            Self::ColorName(_) => "colorName",
            Self::Hue(_) => "hue",
            Self::Saturation(_) => "saturation",
            Self::Battery(_) => "battery",
            Self::Contact(_) => "contact",
            Self::Humidity(_) => "humidity",
            Self::Illuminance(_) => "illuminance",
            Self::Acceleration(_) => "acceleration",
            Self::Motion(_) => "motion",
            Self::Temperature(_) => "temperature",
            Self::Water(_) => "water",
            Self::ThreeAxis(_) => "threeAxis",
            Self::Action(_) => "action",
        }
    }

    /// Returns the value as JSON, the form the device sink receives.
    #[must_use]
    pub fn value(&self) -> Value {
        match self {
            Self::Switch(s) => s.as_str().into(),
            Self::Contact(s) => s.as_str().into(),
            Self::Acceleration(s) | Self::Motion(s) => s.as_str().into(),
            Self::Water(s) => s.as_str().into(),
            Self::ColorName(name) => (*name).into(),
            Self::Action(action) => action.as_str().into(),
            Self::Level(v) | Self::Hue(v) | Self::Saturation(v) => (*v).into(),
            Self::ColorTemperature(k) => (*k).into(),
            Self::Battery(v) | Self::Humidity(v) | Self::Illuminance(v) => (*v).into(),
            Self::Temperature(t) => number(*t),
            Self::ThreeAxis(axes) => Value::Object(
                axes.iter()
                    .map(|(axis, v)| (axis.to_string(), number(*v)))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

/// Integral readings serialize as integers, the rest as floats.
#[allow(clippy::cast_possible_truncation)]
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Value::String(s) => f.write_str(&s),
            other => write!(f, "{other}"),
        }
    }
}

/// A normalized attribute change for one device.
///
/// # Examples
///
/// ```
/// use z2m_bridge::translate::{Attribute, AttributeEvent};
///
/// let event = AttributeEvent::new(Attribute::Level(50)).with_unit("%");
/// assert_eq!(event.name(), "level");
/// assert_eq!(event.value(), serde_json::json!(50));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeEvent {
    attribute: Attribute,
    unit: Option<String>,
    description: Option<String>,
}

impl AttributeEvent {
    /// Creates an event with no unit and no explicit description.
    #[must_use]
    pub fn new(attribute: Attribute) -> Self {
        Self {
            attribute,
            unit: None,
            description: None,
        }
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets an explicit description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Fills in the default description `"<device> <attribute> is <value>"`
    /// unless one is already set.
    #[must_use]
    pub fn describe_for(mut self, friendly_name: &str) -> Self {
        if self.description.is_none() {
            self.description = Some(format!(
                "{friendly_name} {} is {}",
                self.attribute.name(),
                self.attribute
            ));
        }
        self
    }

    /// Returns the typed attribute.
    #[must_use]
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    /// Returns the hub attribute name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.attribute.name()
    }

    /// Returns the value as JSON.
    #[must_use]
    pub fn value(&self) -> Value {
        self.attribute.value()
    }

    /// Returns the unit, if any.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_are_hub_attribute_names() {
        assert_eq!(Attribute::ColorTemperature(2700).name(), "colorTemperature");
        assert_eq!(Attribute::ThreeAxis(BTreeMap::new()).name(), "threeAxis");
        assert_eq!(Attribute::Motion(ActivityState::Active).name(), "motion");
    }

    #[test]
    fn values_render_as_json() {
        assert_eq!(Attribute::Switch(SwitchState::On).value(), json!("on"));
        assert_eq!(Attribute::Temperature(21.5).value(), json!(21.5));
        assert_eq!(Attribute::Temperature(21.0).value(), json!(21));
        assert_eq!(Attribute::Battery(87).value(), json!(87));

        let axes = BTreeMap::from([('x', 12.0), ('z', -3.5)]);
        assert_eq!(Attribute::ThreeAxis(axes).value(), json!({"x": 12, "z": -3.5}));
    }

    #[test]
    fn default_description() {
        let event = AttributeEvent::new(Attribute::Contact(ContactState::Open)).describe_for("Door");
        assert_eq!(event.description(), Some("Door contact is open"));

        let event = AttributeEvent::new(Attribute::Level(50)).describe_for("Lamp");
        assert_eq!(event.description(), Some("Lamp level is 50"));
    }

    #[test]
    fn explicit_description_is_kept() {
        let event = AttributeEvent::new(Attribute::Temperature(20.1))
            .with_description("custom")
            .describe_for("Sensor");
        assert_eq!(event.description(), Some("custom"));
    }
}
