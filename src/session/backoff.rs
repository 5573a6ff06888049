// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Saturating reconnect delay.

use std::time::Duration;

/// Delay of the first retry after a cold failure, in seconds.
pub const INITIAL_RETRY_SECS: u32 = 5;

/// Longest delay between retries, in seconds.
pub const MAX_RETRY_SECS: u32 = 300;

const FAST_STEP_LIMIT_SECS: u32 = 60;
const FAST_STEP_SECS: u32 = 10;
const SLOW_STEP_SECS: u32 = 30;

/// Reconnect delay that grows linearly in two phases.
///
/// Each failure schedules a retry at the current delay and then grows it:
/// by 10 s while below 60 s, by 30 s while below 300 s, never past 300 s.
///
/// # Examples
///
/// ```
/// use z2m_bridge::session::RetryDelay;
///
/// let mut delay = RetryDelay::new();
/// let secs: Vec<u64> = (0..8).map(|_| delay.next_delay().as_secs()).collect();
/// assert_eq!(secs, [5, 15, 25, 35, 45, 55, 65, 95]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDelay {
    secs: u32,
}

impl RetryDelay {
    /// Creates a delay at its starting value.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            secs: INITIAL_RETRY_SECS,
        }
    }

    /// Returns the delay the next failure will be scheduled at.
    #[must_use]
    pub fn current(&self) -> Duration {
        Duration::from_secs(u64::from(self.secs))
    }

    /// Returns whether no failure has been counted since the last reset.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.secs == INITIAL_RETRY_SECS
    }

    /// Returns the delay for this failure and grows the next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current();
        self.secs = if self.secs < FAST_STEP_LIMIT_SECS {
            self.secs + FAST_STEP_SECS
        } else {
            (self.secs + SLOW_STEP_SECS).min(MAX_RETRY_SECS)
        };
        delay
    }

    /// Returns to the starting value after a successful connection.
    pub fn reset(&mut self) {
        self.secs = INITIAL_RETRY_SECS;
    }
}

impl Default for RetryDelay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(count: usize) -> Vec<u64> {
        let mut delay = RetryDelay::new();
        (0..count).map(|_| delay.next_delay().as_secs()).collect()
    }

    #[test]
    fn cold_failure_sequence() {
        assert_eq!(
            sequence(17),
            [5, 15, 25, 35, 45, 55, 65, 95, 125, 155, 185, 215, 245, 275, 300, 300, 300]
        );
    }

    #[test]
    fn never_exceeds_cap() {
        assert!(sequence(200).iter().all(|&secs| secs <= u64::from(MAX_RETRY_SECS)));
    }

    #[test]
    fn sequence_is_monotonic() {
        let secs = sequence(30);
        assert!(secs.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn reset_returns_to_start() {
        let mut delay = RetryDelay::new();
        delay.next_delay();
        delay.next_delay();
        assert!(!delay.is_initial());

        delay.reset();
        assert!(delay.is_initial());
        assert_eq!(delay.next_delay(), Duration::from_secs(5));
    }
}
