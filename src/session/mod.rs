// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker session management.
//!
//! - [`ConnectionManager`]: connect, disconnect, backoff and watchdog
//! - [`RetryDelay`]: the reconnect delay schedule
//! - [`Scheduler`] / [`ScheduledTask`]: cancellable timers owned by a session

mod backoff;
mod connection;
mod scheduler;

pub use backoff::{INITIAL_RETRY_SECS, MAX_RETRY_SECS, RetryDelay};
pub use connection::{ConnectionManager, ConnectionState, RESUBSCRIBE_DELAY, WatchdogAction};
pub use scheduler::{ScheduledTask, Scheduler, TimerEvent, TimerKind};
