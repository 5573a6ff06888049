// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Translation of Zigbee2MQTT state payloads into attribute events.
//!
//! Zigbee2MQTT publishes the full state of a device as one JSON object on
//! `<base>/<friendly_name>`. The [`PayloadTranslator`] maps each known field
//! to zero or more [`AttributeEvent`]s. Fields are independent of each other
//! (except `color_mode`, which selects between the white and color paths),
//! and unknown fields are ignored.
//!
//! | field             | event(s)                               |
//! |-------------------|----------------------------------------|
//! | `state`           | `switch`                               |
//! | `brightness`      | `level` (0-255 → %)                    |
//! | `color_temp`      | `colorTemperature` (mired → K), `colorName` when `color_mode` is `ct` |
//! | `color.hue/saturation` | `hue`, `saturation`, `colorName` otherwise |
//! | `battery`         | `battery` (skipped when null or 0)     |
//! | `contact`         | `contact`                              |
//! | `humidity`        | `humidity`                             |
//! | `illuminance_lux` | `illuminance`                          |
//! | `moving`          | `acceleration`                         |
//! | `occupancy`       | `motion`                               |
//! | `temperature`     | `temperature` (converted to hub scale) |
//! | `water_leak`      | `water`                                |
//! | `x_axis`, ...     | `threeAxis`                            |
//! | `action`          | `action`                               |
//!
//! # Examples
//!
//! ```
//! use z2m_bridge::translate::PayloadTranslator;
//! use z2m_bridge::types::TemperatureScale;
//!
//! let translator = PayloadTranslator::new(TemperatureScale::Celsius);
//! let events = translator.translate("Lamp", r#"{"state":"ON","brightness":128}"#, None);
//!
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[0].name(), "switch");
//! assert_eq!(events[1].value(), serde_json::json!(50));
//! ```

mod attribute;

pub use attribute::{Attribute, AttributeEvent};

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::types::{
    ActivityState, ContactState, SwitchState, TemperatureScale, WaterState,
    color_temperature_name, generic_color_name, hue_degrees_to_percent, mireds_to_kelvin,
};

/// Converts device state payloads into attribute events.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadTranslator {
    target_scale: TemperatureScale,
}

impl PayloadTranslator {
    /// Creates a translator reporting temperatures in `target_scale`.
    #[must_use]
    pub fn new(target_scale: TemperatureScale) -> Self {
        Self { target_scale }
    }

    /// Returns the hub's temperature scale.
    #[must_use]
    pub fn target_scale(&self) -> TemperatureScale {
        self.target_scale
    }

    /// Translates a raw payload.
    ///
    /// `native_scale` is the scale the device reports temperature in, taken
    /// from its declared `temperature` capability; `None` means Celsius.
    /// Payloads that are not a JSON object produce no events.
    #[must_use]
    pub fn translate(
        &self,
        friendly_name: &str,
        payload: &str,
        native_scale: Option<TemperatureScale>,
    ) -> Vec<AttributeEvent> {
        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(fields)) => self.translate_fields(friendly_name, &fields, native_scale),
            Ok(_) => {
                tracing::debug!(device = %friendly_name, "Ignoring non-object state payload");
                Vec::new()
            }
            Err(e) => {
                tracing::debug!(device = %friendly_name, error = %e, "Ignoring non-JSON state payload");
                Vec::new()
            }
        }
    }

    /// Translates an already parsed payload object.
    #[must_use]
    pub fn translate_fields(
        &self,
        friendly_name: &str,
        fields: &Map<String, Value>,
        native_scale: Option<TemperatureScale>,
    ) -> Vec<AttributeEvent> {
        let mut out = Vec::new();
        let mut push = |event: AttributeEvent| out.push(event.describe_for(friendly_name));

        if let Some(state) = fields.get("state") {
            let state = state.as_str().map_or(SwitchState::Off, SwitchState::from_payload);
            push(AttributeEvent::new(Attribute::Switch(state)));
        }

        if let Some(brightness) = number(fields, "brightness") {
            push(AttributeEvent::new(Attribute::Level(brightness_percent(brightness))).with_unit("%"));
        }

        let color_mode = fields.get("color_mode").and_then(Value::as_str);
        if color_mode == Some("ct") {
            if let Some(kelvin) = number(fields, "color_temp").and_then(mireds_to_kelvin) {
                push(AttributeEvent::new(Attribute::ColorTemperature(kelvin)).with_unit("K"));
                push(AttributeEvent::new(Attribute::ColorName(color_temperature_name(kelvin))));
            }
        } else if let Some(Value::Object(color)) = fields.get("color") {
            let hue = color.get("hue").and_then(Value::as_f64);
            let saturation = color.get("saturation").and_then(Value::as_f64);
            if let Some(hue) = hue {
                push(AttributeEvent::new(Attribute::Hue(hue_degrees_to_percent(hue))).with_unit("%"));
            }
            if let Some(saturation) = saturation {
                push(AttributeEvent::new(Attribute::Saturation(percent(saturation))).with_unit("%"));
            }
            if let (Some(hue), Some(saturation)) = (hue, saturation) {
                push(AttributeEvent::new(Attribute::ColorName(generic_color_name(hue, saturation))));
            }
        }

        if let Some(battery) = number(fields, "battery").filter(|b| *b != 0.0) {
            push(AttributeEvent::new(Attribute::Battery(round(battery))).with_unit("%"));
        }

        if let Some(contact) = boolean(fields, "contact") {
            push(AttributeEvent::new(Attribute::Contact(ContactState::from(contact))));
        }

        if let Some(humidity) = number(fields, "humidity") {
            push(AttributeEvent::new(Attribute::Humidity(round(humidity))).with_unit("%"));
        }

        if let Some(lux) = number(fields, "illuminance_lux") {
            push(AttributeEvent::new(Attribute::Illuminance(round(lux))).with_unit("lux"));
        }

        if let Some(moving) = boolean(fields, "moving") {
            push(AttributeEvent::new(Attribute::Acceleration(ActivityState::from(moving))));
        }

        if let Some(occupancy) = boolean(fields, "occupancy") {
            push(AttributeEvent::new(Attribute::Motion(ActivityState::from(occupancy))));
        }

        if let Some(raw) = number(fields, "temperature") {
            let value = native_scale
                .unwrap_or_default()
                .convert(raw, self.target_scale);
            let unit = self.target_scale.symbol();
            push(
                AttributeEvent::new(Attribute::Temperature(value))
                    .with_unit(unit)
                    .with_description(format!("{friendly_name} temperature is {value}{unit}")),
            );
        }

        if let Some(leak) = boolean(fields, "water_leak") {
            push(AttributeEvent::new(Attribute::Water(WaterState::from(leak))));
        }

        let axes: BTreeMap<char, f64> = fields
            .iter()
            .filter_map(|(key, value)| Some((axis_key(key)?, value.as_f64()?)))
            .collect();
        if !axes.is_empty() {
            push(AttributeEvent::new(Attribute::ThreeAxis(axes)));
        }

        // Zigbee2MQTT clears `action` with an empty string after each press.
        if let Some(action) = fields.get("action").and_then(Value::as_str).filter(|a| !a.is_empty()) {
            push(AttributeEvent::new(Attribute::Action(action.to_string())));
        }

        out
    }
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(Value::as_f64)
}

fn boolean(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    fields.get(key).and_then(Value::as_bool)
}

/// `x_axis` → `x`. Only single-letter axis names qualify.
fn axis_key(key: &str) -> Option<char> {
    let axis = key.strip_suffix("_axis")?;
    let mut chars = axis.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round(value: f64) -> i64 {
    value.round() as i64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

fn brightness_percent(raw: f64) -> u8 {
    percent(raw / 255.0 * 100.0)
}
