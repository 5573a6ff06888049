// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pub/sub notifications about a bridge session.
//!
//! The session publishes a [`BridgeEvent`] on every connection change,
//! directory refresh, claim, abandonment and attribute delivery. Consumers
//! subscribe through the [`EventBus`] and receive their own copy of each
//! event.

mod bridge_event;
mod event_bus;

pub use bridge_event::BridgeEvent;
pub use event_bus::EventBus;
