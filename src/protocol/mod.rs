// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker transport and topic routing.
//!
//! The session talks to the broker through the [`Transport`] trait: a
//! callback-style client that reports status changes and inbound messages
//! as [`TransportEvent`]s on a channel. [`RumqttTransport`] implements it on
//! top of `rumqttc` (feature `mqtt`). Reconnection is never the transport's
//! job; a failed transport reports [`TransportStatus::Failed`] and stops.
//!
//! Inbound topics are classified by [`classify_topic`].

#[cfg(feature = "mqtt")]
mod rumqtt;
mod topic_router;

#[cfg(feature = "mqtt")]
pub use rumqtt::RumqttTransport;
pub use topic_router::{RESERVED_SUFFIXES, Route, classify_topic};

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::BridgeConfig;
use crate::error::TransportError;

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qos {
    /// Fire and forget.
    #[default]
    AtMostOnce,
    /// Acknowledged delivery, possibly duplicated.
    AtLeastOnce,
    /// Exactly once.
    ExactlyOnce,
}

impl Qos {
    /// Maps the numeric MQTT level, clamping anything above 2.
    #[must_use]
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::AtMostOnce,
            1 => Self::AtLeastOnce,
            _ => Self::ExactlyOnce,
        }
    }
}

#[cfg(feature = "mqtt")]
impl From<Qos> for rumqttc::QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => Self::AtMostOnce,
            Qos::AtLeastOnce => Self::AtLeastOnce,
            Qos::ExactlyOnce => Self::ExactlyOnce,
        }
    }
}

/// Parameters for opening a broker connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Broker host name or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Optional `(username, password)`.
    pub credentials: Option<(String, String)>,
    /// Keep-alive interval.
    pub keep_alive: Duration,
}

impl From<&BridgeConfig> for ConnectOptions {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            host: config.host().to_string(),
            port: config.port(),
            client_id: config.client_id().to_string(),
            credentials: config
                .credentials()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
            keep_alive: config.keep_alive(),
        }
    }
}

/// Connection status reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    /// The broker accepted the connection.
    Connected,
    /// The connection was refused or dropped.
    Failed(String),
}

/// Something a transport observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection status changed.
    Status(TransportStatus),
    /// A message arrived on a subscribed topic.
    Message {
        /// Full topic.
        topic: String,
        /// UTF-8 payload.
        payload: String,
    },
}

/// A callback-driven MQTT client.
///
/// Methods never block for longer than it takes to queue a request.
/// Outcomes of `open` arrive later as [`TransportEvent::Status`].
pub trait Transport: Send {
    /// Starts connecting. Events for this connection go to `events`.
    ///
    /// # Errors
    ///
    /// Returns error if the connection attempt cannot even be started.
    fn open(
        &mut self,
        options: &ConnectOptions,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError>;

    /// Tears down the current connection, if any. Posts no further events.
    fn close(&mut self);

    /// Returns the client's live view of the connection.
    fn is_connected(&self) -> bool;

    /// Subscribes to `topic`.
    ///
    /// # Errors
    ///
    /// Returns error if no connection is open or the request is rejected.
    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), TransportError>;

    /// Publishes `payload` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns error if no connection is open or the request is rejected.
    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        qos: Qos,
        retained: bool,
    ) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_from_level() {
        assert_eq!(Qos::from_level(0), Qos::AtMostOnce);
        assert_eq!(Qos::from_level(1), Qos::AtLeastOnce);
        assert_eq!(Qos::from_level(2), Qos::ExactlyOnce);
        assert_eq!(Qos::from_level(7), Qos::ExactlyOnce);
    }

    #[test]
    fn connect_options_from_config() {
        let config = BridgeConfig::builder()
            .host("mqtt://broker.local:1884")
            .client_id("hub-1")
            .credentials("user", "secret")
            .build()
            .unwrap();
        let options = ConnectOptions::from(&config);

        assert_eq!(options.host, "broker.local");
        assert_eq!(options.port, 1884);
        assert_eq!(options.client_id, "hub-1");
        assert_eq!(
            options.credentials,
            Some(("user".to_string(), "secret".to_string()))
        );
        assert_eq!(options.keep_alive, Duration::from_secs(30));
    }
}
