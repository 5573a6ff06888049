// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value types shared by the payload translator and the configuration.
//!
//! # Types
//!
//! - [`SwitchState`], [`ContactState`], [`ActivityState`], [`WaterState`] -
//!   binary attribute states with a fixed meaning for `true`
//! - [`TemperatureScale`] - Celsius/Fahrenheit with conversion
//! - color helpers: mireds to Kelvin, hue percentage, generic color names

mod binary;
mod color;
mod temperature;

pub use binary::{ActivityState, ContactState, SwitchState, WaterState};
pub use color::{color_temperature_name, generic_color_name, hue_degrees_to_percent, mireds_to_kelvin};
pub use temperature::{TemperatureScale, round_tenths};
