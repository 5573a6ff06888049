// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [`Transport`] implementation backed by `rumqttc`.
//!
//! Each [`open`](Transport::open) creates a fresh `AsyncClient` and spawns a
//! task polling its event loop. The task stops at the first error instead of
//! letting `rumqttc` retry, so the session's backoff schedule stays in charge
//! of reconnecting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ConnectOptions, Qos, Transport, TransportEvent, TransportStatus};
use crate::error::TransportError;

const DEFAULT_REQUEST_CAPACITY: usize = 10;

/// State shared between the transport and its event loop task.
#[derive(Debug, Default)]
struct Link {
    connected: AtomicBool,
    /// Cleared by `close`; the task posts nothing afterwards.
    active: AtomicBool,
}

/// MQTT transport over `rumqttc`.
///
/// Must be opened from within a tokio runtime.
#[derive(Debug)]
pub struct RumqttTransport {
    capacity: usize,
    client: Option<AsyncClient>,
    task: Option<JoinHandle<()>>,
    link: Option<Arc<Link>>,
}

impl RumqttTransport {
    /// Creates a closed transport.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REQUEST_CAPACITY)
    }

    /// Creates a closed transport whose client queues up to `capacity`
    /// outgoing requests.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            client: None,
            task: None,
            link: None,
        }
    }

    fn client(&self) -> Result<&AsyncClient, TransportError> {
        self.client.as_ref().ok_or(TransportError::NotConnected)
    }
}

impl Default for RumqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RumqttTransport {
    fn open(
        &mut self,
        options: &ConnectOptions,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<(), TransportError> {
        self.close();

        if options.host.is_empty() {
            return Err(TransportError::InvalidAddress(
                "MQTT broker host is required".to_string(),
            ));
        }

        let mut mqtt_options = MqttOptions::new(&options.client_id, &options.host, options.port);
        mqtt_options.set_keep_alive(options.keep_alive);
        mqtt_options.set_clean_session(true);
        if let Some((username, password)) = &options.credentials {
            mqtt_options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(mqtt_options, self.capacity);
        let link = Arc::new(Link {
            connected: AtomicBool::new(false),
            active: AtomicBool::new(true),
        });

        tracing::debug!(
            host = %options.host,
            port = options.port,
            client_id = %options.client_id,
            "Opening MQTT connection"
        );
        self.task = Some(tokio::spawn(handle_events(
            event_loop,
            Arc::clone(&link),
            events,
        )));
        self.client = Some(client);
        self.link = Some(link);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(link) = self.link.take() {
            link.active.store(false, Ordering::Release);
            link.connected.store(false, Ordering::Release);
        }
        let sent = self
            .client
            .take()
            .is_some_and(|client| client.try_disconnect().is_ok());
        if let Some(task) = self.task.take() {
            // A queued disconnect lets the task finish on its own.
            if !sent {
                task.abort();
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.connected.load(Ordering::Acquire))
    }

    fn subscribe(&mut self, topic: &str, qos: Qos) -> Result<(), TransportError> {
        self.client()?.try_subscribe(topic, qos.into())?;
        Ok(())
    }

    fn publish(
        &mut self,
        topic: &str,
        payload: &str,
        qos: Qos,
        retained: bool,
    ) -> Result<(), TransportError> {
        self.client()?
            .try_publish(topic, qos.into(), retained, payload.to_owned())?;
        Ok(())
    }
}

impl Drop for RumqttTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Polls the event loop until the connection ends.
async fn handle_events(
    mut event_loop: EventLoop,
    link: Arc<Link>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let post = |event: TransportEvent| {
        if link.active.load(Ordering::Acquire) {
            // The session may already be gone.
            let _ = events.send(event);
        }
    };

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(connack))) => {
                if connack.code == ConnectReturnCode::Success {
                    tracing::debug!(?connack, "MQTT broker accepted connection");
                    link.connected.store(true, Ordering::Release);
                    post(TransportEvent::Status(TransportStatus::Connected));
                } else {
                    tracing::warn!(code = ?connack.code, "MQTT broker refused connection");
                    post(TransportEvent::Status(TransportStatus::Failed(format!(
                        "connection refused: {:?}",
                        connack.code
                    ))));
                    break;
                }
            }
            Ok(Event::Incoming(Packet::SubAck(suback))) => {
                tracing::debug!(?suback, "MQTT subscription acknowledged");
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                match String::from_utf8(publish.payload.to_vec()) {
                    Ok(payload) => post(TransportEvent::Message {
                        topic: publish.topic.clone(),
                        payload,
                    }),
                    Err(_) => {
                        tracing::debug!(topic = %publish.topic, "Dropping non UTF-8 payload");
                    }
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                tracing::info!("MQTT broker closed the connection");
                post(TransportEvent::Status(TransportStatus::Failed(
                    "broker closed the connection".to_string(),
                )));
                break;
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::debug!("MQTT connection closed locally");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "MQTT event loop error");
                post(TransportEvent::Status(TransportStatus::Failed(e.to_string())));
                break;
            }
        }
    }
    link.connected.store(false, Ordering::Release);
}
