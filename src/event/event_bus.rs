// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast channel for bridge events.

use tokio::sync::broadcast;

use super::BridgeEvent;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Fans [`BridgeEvent`]s out to any number of subscribers.
///
/// A subscriber that falls more than the channel capacity behind loses the
/// oldest events and sees `RecvError::Lagged`. Publishing never blocks the
/// session.
///
/// # Examples
///
/// ```
/// use z2m_bridge::event::{BridgeEvent, EventBus};
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
///
/// bus.publish(BridgeEvent::directory_refreshed(1, 4));
/// assert!(matches!(rx.try_recv(), Ok(BridgeEvent::DirectoryRefreshed { devices: 4, .. })));
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity of 256 events.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus buffering at most `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event, returning how many subscribers received it.
    pub fn publish(&self, event: BridgeEvent) -> usize {
        // No subscribers is not an error.
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::DriverProfile;

    #[test]
    fn subscriber_count_tracks_receivers() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(rx1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let delivered = bus.publish(BridgeEvent::device_claimed("0xabc", DriverProfile::Rgb));
        assert_eq!(delivered, 2);

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.ieee_address(), Some("0xabc"));
        }
    }

    #[test]
    fn publish_without_subscribers_is_dropped() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(BridgeEvent::device_abandoned("0x01")), 0);
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::with_capacity(8);
        let other = bus.clone();
        let _rx = bus.subscribe();
        assert_eq!(other.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();
        for generation in 0..4 {
            bus.publish(BridgeEvent::directory_refreshed(generation, 0));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
    }
}
