// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The bridge session.
//!
//! A [`Bridge`] is a single tokio task that owns all session state: the
//! connection, the claim table, the timers and the verbose logging flag.
//! Transport events, fired timers, watchdog ticks and commands from
//! [`BridgeHandle`]s arrive on channels and are handled one at a time, so
//! nothing in the session needs locking. The directory snapshot is the one
//! piece of shared state; it lives in a [`DeviceRegistry`] that handles read
//! without going through the task.
//!
//! ```text
//! transport ─┐
//! timers ────┼─▶ Bridge task ─▶ TopicRouter ─┬─▶ DeviceRegistry (directory)
//! watchdog ──┤                               └─▶ PayloadTranslator ─▶ DeviceSink
//! handles ───┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use z2m_bridge::{Bridge, BridgeConfig, MemorySink, RumqttTransport};
//!
//! #[tokio::main]
//! async fn main() -> z2m_bridge::Result<()> {
//!     let config = BridgeConfig::builder().host("mqtt://192.168.1.50").build()?;
//!     let sink = Arc::new(MemorySink::new());
//!     let bridge = Bridge::new(config, Box::new(RumqttTransport::new()), sink).spawn();
//!
//!     for device in bridge.list_devices() {
//!         bridge.claim(&device.ieee_address).await?;
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use crate::claims::{Claim, ClaimTable, DriverAssignment};
use crate::classify::CapabilityClassifier;
use crate::config::BridgeConfig;
use crate::directory::{
    DeviceDescriptor, DeviceRegistry, GroupDescriptor, parse_devices, parse_groups,
};
use crate::error::{Error, ParseError, Result};
use crate::event::{BridgeEvent, EventBus};
use crate::protocol::{
    ConnectOptions, Qos, Route, Transport, TransportEvent, TransportStatus, classify_topic,
};
use crate::session::{
    ConnectionManager, ConnectionState, ScheduledTask, Scheduler, TimerEvent, TimerKind,
    WatchdogAction,
};
use crate::sink::DeviceSink;
use crate::translate::PayloadTranslator;
use crate::types::TemperatureScale;

/// Interval between watchdog ticks.
pub const WATCHDOG_PERIOD: Duration = Duration::from_secs(60);

/// Pause between creating a child device and asking for its state.
pub const REQUEST_STATE_DELAY: Duration = Duration::from_millis(500);

/// Requests handled by the session task.
#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    Watchdog,
    SetDebugLogging(bool),
    Publish {
        topic: String,
        payload: String,
        qos: Qos,
        retained: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    Subscribe {
        topic: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Claim {
        ieee_address: String,
        reply: oneshot::Sender<Result<Claim>>,
    },
    Rematch {
        ieee_address: String,
        reply: oneshot::Sender<Result<DriverAssignment>>,
    },
    State {
        reply: oneshot::Sender<ConnectionState>,
    },
    DebugLogging {
        reply: oneshot::Sender<bool>,
    },
    Shutdown,
}

struct Inbox {
    commands: mpsc::UnboundedReceiver<Command>,
    transport: mpsc::UnboundedReceiver<TransportEvent>,
    timers: mpsc::UnboundedReceiver<TimerEvent>,
}

/// A bridge session, ready to be spawned.
pub struct Bridge {
    config: BridgeConfig,
    connection: ConnectionManager,
    registry: Arc<DeviceRegistry>,
    translator: PayloadTranslator,
    classifier: CapabilityClassifier,
    claims: ClaimTable,
    sink: Arc<dyn DeviceSink>,
    events: EventBus,
    scheduler: Scheduler,
    debug_logging: bool,
    debug_timer: Option<ScheduledTask>,
    state_requests: HashMap<String, ScheduledTask>,
    last_state: ConnectionState,
    commands: mpsc::UnboundedSender<Command>,
    inbox: Inbox,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("session_id", &self.config.session_id())
            .field("connection", &self.connection)
            .field("claims", &self.claims.len())
            .field("debug_logging", &self.debug_logging)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Creates a session over `transport`, delivering events to `sink`.
    ///
    /// Existing child devices are read from the sink to rebuild the claim
    /// table.
    #[must_use]
    pub fn new(config: BridgeConfig, transport: Box<dyn Transport>, sink: Arc<dyn DeviceSink>) -> Self {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (scheduler, timers_rx) = Scheduler::new();

        let connection = ConnectionManager::new(
            config.session_id(),
            ConnectOptions::from(&config),
            transport,
            transport_tx,
            scheduler.clone(),
        );

        Self {
            translator: PayloadTranslator::new(config.temperature_scale()),
            claims: ClaimTable::from_sink(sink.as_ref()),
            connection,
            registry: Arc::new(DeviceRegistry::new()),
            classifier: CapabilityClassifier::default(),
            sink,
            events: EventBus::new(),
            scheduler,
            debug_logging: false,
            debug_timer: None,
            state_requests: HashMap::new(),
            last_state: ConnectionState::Disconnected,
            commands,
            inbox: Inbox {
                commands: commands_rx,
                transport: transport_rx,
                timers: timers_rx,
            },
            config,
        }
    }

    /// Replaces the classifier used for new claims.
    #[must_use]
    pub fn with_classifier(mut self, classifier: CapabilityClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Publishes session events on `events` instead of a private bus.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Starts the session task and returns a handle to it.
    ///
    /// The first watchdog tick runs immediately and performs the initial
    /// connect. Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> BridgeHandle {
        let handle = BridgeHandle {
            commands: self.commands.clone(),
            base_topic: Arc::from(self.config.base_topic()),
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
        };
        tokio::spawn(self.run());
        handle
    }

    async fn run(mut self) {
        let mut watchdog = tokio::time::interval_at(Instant::now(), WATCHDOG_PERIOD);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(session = %self.config.session_id(), "Bridge session started");

        loop {
            tokio::select! {
                biased;
                _ = watchdog.tick() => self.watchdog(),
                Some(event) = self.inbox.timers.recv() => self.on_timer(&event),
                Some(event) = self.inbox.transport.recv() => self.on_transport_event(event),
                command = self.inbox.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.on_command(command),
                },
            }
            self.publish_state_change();
        }

        self.connection.disconnect();
        self.publish_state_change();
        tracing::info!(session = %self.config.session_id(), "Bridge session stopped");
    }

    /// Full (re)initialization: reconnect, re-read claims, re-arm verbose
    /// logging.
    fn initialize(&mut self) {
        tracing::info!(session = %self.config.session_id(), "Initializing bridge session");
        self.claims = ClaimTable::from_sink(self.sink.as_ref());
        self.set_debug_logging(self.config.debug_logging());
        self.connection.connect();
    }

    fn watchdog(&mut self) {
        match self.connection.watchdog() {
            WatchdogAction::Initialize => self.initialize(),
            WatchdogAction::Rearmed | WatchdogAction::Idle => {}
        }
    }

    fn set_debug_logging(&mut self, enabled: bool) {
        self.debug_logging = enabled;
        self.debug_timer = enabled.then(|| {
            let duration = self.config.debug_logging_duration();
            tracing::info!(minutes = duration.as_secs() / 60, "Verbose logging enabled");
            self.scheduler
                .schedule(duration, TimerKind::DebugLoggingExpired)
        });
    }

    fn publish_state_change(&mut self) {
        let state = self.connection.state();
        if state != self.last_state {
            self.last_state = state;
            self.events.publish(BridgeEvent::connection_changed(
                self.config.session_id(),
                state,
            ));
        }
    }

    fn on_timer(&mut self, event: &TimerEvent) {
        match &event.kind {
            TimerKind::Reconnect | TimerKind::Resubscribe => {
                if self.connection.on_timer(event) {
                    self.resubscribe();
                }
            }
            TimerKind::DebugLoggingExpired => {
                if self.debug_timer.as_ref().is_some_and(|t| t.fired(event)) {
                    self.debug_timer = None;
                    self.debug_logging = false;
                    tracing::info!("Verbose logging disabled");
                }
            }
            TimerKind::RequestState { ieee_address } => {
                let current = self
                    .state_requests
                    .get(ieee_address)
                    .is_some_and(|t| t.fired(event));
                if current {
                    self.state_requests.remove(ieee_address);
                    self.request_state(ieee_address);
                }
            }
        }
    }

    fn resubscribe(&mut self) {
        let topic = self.config.subscription_topic();
        match self
            .connection
            .transport()
            .and_then(|t| t.subscribe(&topic, Qos::AtMostOnce))
        {
            Ok(()) => tracing::info!(topic = %topic, "Subscribed to Zigbee2MQTT topics"),
            Err(e) => tracing::warn!(topic = %topic, error = %e, "Subscribe failed"),
        }
    }

    fn request_state(&mut self, ieee_address: &str) {
        let Some(device) = self.registry.by_ieee(ieee_address) else {
            tracing::debug!(ieee = %ieee_address, "Device left directory before state request");
            return;
        };
        let topic = format!("{}/get", self.config.device_topic(&device.friendly_name));
        if let Err(e) = self.publish(&topic, &json!({ "state": "" }).to_string(), Qos::AtMostOnce, false) {
            tracing::debug!(ieee = %ieee_address, error = %e, "State request not sent");
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Status(status) => {
                if let TransportStatus::Failed(reason) = &status {
                    tracing::debug!(%reason, "Transport reported failure");
                }
                self.connection.on_transport_status(status);
            }
            TransportEvent::Message { topic, payload } => self.on_message(&topic, &payload),
        }
    }

    fn on_message(&mut self, topic: &str, payload: &str) {
        if self.debug_logging {
            tracing::debug!(topic = %topic, payload = %payload, "Message received");
        }

        match classify_topic(self.config.base_topic(), topic) {
            Route::DeviceDirectory => self.refresh_devices(payload),
            Route::GroupDirectory => self.refresh_groups(payload),
            Route::BridgeInfo => tracing::debug!(topic = %topic, "Ignoring bridge topic"),
            Route::Reserved { suffix } => {
                tracing::trace!(topic = %topic, suffix, "Ignoring reserved topic");
            }
            Route::DeviceState { friendly_name } => {
                if let Err(e) = self.device_state(friendly_name, payload) {
                    tracing::debug!(topic = %topic, error = %e, "Dropping device state");
                }
            }
            Route::Ignored => tracing::trace!(topic = %topic, "Ignoring topic"),
        }
    }

    fn refresh_devices(&mut self, payload: &str) {
        let devices = match parse_devices(payload) {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!(error = %e, "Keeping previous device directory");
                return;
            }
        };
        let snapshot = self.registry.replace_devices(devices);
        tracing::info!(
            generation = snapshot.generation(),
            devices = snapshot.devices().count(),
            "Device directory refreshed"
        );
        self.events.publish(BridgeEvent::directory_refreshed(
            snapshot.generation(),
            snapshot.devices().count(),
        ));

        let changes = self.claims.reconcile(&snapshot);
        for ieee in changes.abandoned {
            self.events.publish(BridgeEvent::device_abandoned(ieee));
        }
    }

    fn refresh_groups(&mut self, payload: &str) {
        match parse_groups(payload) {
            Ok(groups) => {
                let snapshot = self.registry.replace_groups(groups);
                tracing::debug!(groups = snapshot.groups().len(), "Group directory refreshed");
            }
            Err(e) => tracing::warn!(error = %e, "Keeping previous group directory"),
        }
    }

    fn device_state(&mut self, friendly_name: &str, payload: &str) -> Result<()> {
        let directory = self.registry.snapshot();
        let device = directory
            .by_friendly_name(friendly_name)
            .ok_or_else(|| Error::UnresolvedDevice(friendly_name.to_string()))?;
        if !self.claims.is_claimed(&device.ieee_address) {
            return Err(Error::NotClaimed(device.ieee_address.clone()));
        }

        let native_scale = device
            .capability("temperature")
            .and_then(|cap| cap.unit.as_deref())
            .and_then(TemperatureScale::from_unit);
        let events = self.translator.translate(friendly_name, payload, native_scale);
        if events.is_empty() {
            return Ok(());
        }

        if self.debug_logging {
            for event in &events {
                tracing::debug!(
                    ieee = %device.ieee_address,
                    attribute = event.name(),
                    value = %event.value(),
                    "Attribute event"
                );
            }
        }
        self.sink.emit(&device.ieee_address, &events);
        self.events.publish(BridgeEvent::attributes_emitted(
            device.ieee_address.clone(),
            events,
        ));
        Ok(())
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Connect => self.connection.connect(),
            Command::Disconnect => self.connection.disconnect(),
            Command::Watchdog => self.watchdog(),
            Command::SetDebugLogging(enabled) => self.set_debug_logging(enabled),
            Command::Publish {
                topic,
                payload,
                qos,
                retained,
                reply,
            } => {
                let _ = reply.send(self.publish(&topic, &payload, qos, retained));
            }
            Command::Subscribe { topic, reply } => {
                let result = self
                    .connection
                    .transport()
                    .and_then(|t| t.subscribe(&topic, Qos::AtMostOnce))
                    .map_err(Error::from);
                let _ = reply.send(result);
            }
            Command::Claim {
                ieee_address,
                reply,
            } => {
                let _ = reply.send(self.claim(&ieee_address));
            }
            Command::Rematch {
                ieee_address,
                reply,
            } => {
                let _ = reply.send(self.rematch(&ieee_address));
            }
            Command::State { reply } => {
                let _ = reply.send(self.connection.state());
            }
            Command::DebugLogging { reply } => {
                let _ = reply.send(self.debug_logging);
            }
            // Handled by the run loop.
            Command::Shutdown => {}
        }
    }

    fn publish(&mut self, topic: &str, payload: &str, qos: Qos, retained: bool) -> Result<()> {
        if self.debug_logging {
            tracing::debug!(topic = %topic, payload = %payload, "Publishing");
        }
        self.connection
            .transport()?
            .publish(topic, payload, qos, retained)?;
        Ok(())
    }

    fn claimable(&self, ieee_address: &str) -> Result<DeviceDescriptor> {
        self.registry
            .by_ieee(ieee_address)
            .filter(|device| !device.is_coordinator())
            .ok_or_else(|| Error::UnresolvedDevice(ieee_address.to_string()))
    }

    fn claim(&mut self, ieee_address: &str) -> Result<Claim> {
        let device = self.claimable(ieee_address)?;
        let claim = self
            .claims
            .claim(&device, &self.classifier, self.sink.as_ref());
        if claim.is_created() {
            self.after_assignment(claim.assignment());
        }
        Ok(claim)
    }

    fn rematch(&mut self, ieee_address: &str) -> Result<DriverAssignment> {
        let device = self.claimable(ieee_address)?;
        if !self.claims.is_claimed(ieee_address) {
            return Err(Error::NotClaimed(ieee_address.to_string()));
        }
        let assignment = self
            .claims
            .rematch(&device, &self.classifier, self.sink.as_ref());
        self.after_assignment(&assignment);
        Ok(assignment)
    }

    fn after_assignment(&mut self, assignment: &DriverAssignment) {
        if let Some(profile) = assignment.profile() {
            self.events.publish(BridgeEvent::device_claimed(
                assignment.ieee_address.clone(),
                profile,
            ));
        }
        let timer = self.scheduler.schedule(
            REQUEST_STATE_DELAY,
            TimerKind::RequestState {
                ieee_address: assignment.ieee_address.clone(),
            },
        );
        self.state_requests
            .insert(assignment.ieee_address.clone(), timer);
    }
}

/// Cheap, cloneable access to a running [`Bridge`].
///
/// Directory reads go straight to the shared registry. Everything else is
/// sent to the session task; methods fail with [`Error::SessionClosed`] once
/// it has stopped.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    commands: mpsc::UnboundedSender<Command>,
    base_topic: Arc<str>,
    registry: Arc<DeviceRegistry>,
    events: EventBus,
}

impl BridgeHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::SessionClosed)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| Error::SessionClosed)
    }

    /// Connects, closing any open transport and cancelling a pending retry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub fn connect(&self) -> Result<()> {
        self.send(Command::Connect)
    }

    /// Disconnects and stops retrying until the next [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub fn disconnect(&self) -> Result<()> {
        self.send(Command::Disconnect)
    }

    /// Runs a watchdog check now.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub fn watchdog(&self) -> Result<()> {
        self.send(Command::Watchdog)
    }

    /// Turns verbose logging on for the configured duration, or off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub fn set_debug_logging(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetDebugLogging(enabled))
    }

    /// Stops the session task, closing the transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has already stopped.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// Returns the session's connection state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub async fn state(&self) -> Result<ConnectionState> {
        self.request(|reply| Command::State { reply }).await
    }

    /// Returns whether verbose logging is currently on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the session has stopped.
    pub async fn debug_logging(&self) -> Result<bool> {
        self.request(|reply| Command::DebugLogging { reply }).await
    }

    /// Publishes a raw message.
    ///
    /// # Errors
    ///
    /// Returns error if the session is not connected or the transport
    /// rejects the message.
    pub async fn publish(
        &self,
        topic: impl Into<String>,
        payload: impl Into<String>,
        qos: Qos,
        retained: bool,
    ) -> Result<()> {
        let topic = topic.into();
        let payload = payload.into();
        self.request(|reply| Command::Publish {
            topic,
            payload,
            qos,
            retained,
            reply,
        })
        .await?
    }

    /// Subscribes to an additional topic.
    ///
    /// # Errors
    ///
    /// Returns error if the session is not connected or the transport
    /// rejects the request.
    pub async fn subscribe(&self, topic: impl Into<String>) -> Result<()> {
        let topic = topic.into();
        self.request(|reply| Command::Subscribe { topic, reply })
            .await?
    }

    /// Sends a command object to `<base>/<friendly_name>/set`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedPayload`] if `payload` is not a JSON
    /// object, or any error of [`publish`](Self::publish).
    pub async fn set(&self, friendly_name: &str, payload: &Value) -> Result<()> {
        self.device_request(friendly_name, "set", payload).await
    }

    /// Sends a query object to `<base>/<friendly_name>/get`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedPayload`] if `payload` is not a JSON
    /// object, or any error of [`publish`](Self::publish).
    pub async fn get(&self, friendly_name: &str, payload: &Value) -> Result<()> {
        self.device_request(friendly_name, "get", payload).await
    }

    async fn device_request(&self, friendly_name: &str, suffix: &str, payload: &Value) -> Result<()> {
        if !payload.is_object() {
            return Err(ParseError::MalformedPayload(format!(
                "{suffix} payload must be a JSON object"
            ))
            .into());
        }
        let topic = format!("{}/{friendly_name}/{suffix}", self.base_topic);
        self.publish(topic, payload.to_string(), Qos::AtMostOnce, false)
            .await
    }

    /// Claims a directory device, creating its child device on first claim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedDevice`] if the address is not in the
    /// current directory or is the coordinator.
    pub async fn claim(&self, ieee_address: &str) -> Result<Claim> {
        let ieee_address = ieee_address.to_string();
        self.request(|reply| Command::Claim {
            ieee_address,
            reply,
        })
        .await?
    }

    /// Reclassifies a claimed device and replaces its assignment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnresolvedDevice`] if the address is not in the
    /// current directory, or [`Error::NotClaimed`] if it was never claimed.
    pub async fn rematch(&self, ieee_address: &str) -> Result<DriverAssignment> {
        let ieee_address = ieee_address.to_string();
        self.request(|reply| Command::Rematch {
            ieee_address,
            reply,
        })
        .await?
    }

    /// Lists the current directory, coordinator excluded.
    #[must_use]
    pub fn list_devices(&self) -> Vec<DeviceDescriptor> {
        self.registry.list_devices()
    }

    /// Lists the current groups.
    #[must_use]
    pub fn list_groups(&self) -> Vec<GroupDescriptor> {
        self.registry.list_groups()
    }

    /// Returns the shared directory registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }
}
