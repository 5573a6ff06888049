// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broker session state machine.
//!
//! ```text
//!                 connect()             status: Connected
//! Disconnected ─────────────▶ Connecting ─────────────────▶ Connected
//!      ▲                          │                            │
//!      └──────── failure ─────────┴──── failure / disconnect ──┘
//!                    │
//!                    └─▶ reconnect timer (5 s, 15 s, ... 300 s)
//! ```
//!
//! Failures never stop the session. Only [`ConnectionManager::disconnect`]
//! stops retrying, and only [`ConnectionManager::connect`] resumes.

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;

use super::backoff::RetryDelay;
use super::scheduler::{ScheduledTask, Scheduler, TimerEvent, TimerKind};
use crate::error::TransportError;
use crate::protocol::{ConnectOptions, Transport, TransportEvent, TransportStatus};

/// Delay between a successful connect and the base topic subscription.
pub const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(4);

/// State of a broker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport, or the transport failed.
    #[default]
    Disconnected,
    /// A transport is open and waiting for the broker.
    Connecting,
    /// The broker accepted the connection.
    Connected,
}

impl ConnectionState {
    /// Returns `true` when connected.
    #[must_use]
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        })
    }
}

/// What a watchdog tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogAction {
    /// First tick of the session. The caller must run a full initialize.
    Initialize,
    /// The live transport disagreed with the recorded state; a reconnect
    /// was scheduled.
    Rearmed,
    /// Nothing to do.
    Idle,
}

/// Owns the transport and its reconnect schedule.
pub struct ConnectionManager {
    session_id: String,
    options: ConnectOptions,
    transport: Box<dyn Transport>,
    transport_events: mpsc::UnboundedSender<TransportEvent>,
    scheduler: Scheduler,
    state: ConnectionState,
    retry: RetryDelay,
    reconnect: Option<ScheduledTask>,
    resubscribe: Option<ScheduledTask>,
    transport_open: bool,
    stopped: bool,
    initialized: bool,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("session_id", &self.session_id)
            .field("state", &self.state)
            .field("retry", &self.retry)
            .field("reconnect_pending", &self.reconnect.is_some())
            .field("stopped", &self.stopped)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Creates a disconnected manager.
    ///
    /// Transport events are delivered to `transport_events`; timers are
    /// created through `scheduler`.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        options: ConnectOptions,
        transport: Box<dyn Transport>,
        transport_events: mpsc::UnboundedSender<TransportEvent>,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            options,
            transport,
            transport_events,
            scheduler,
            state: ConnectionState::Disconnected,
            retry: RetryDelay::new(),
            reconnect: None,
            resubscribe: None,
            transport_open: false,
            stopped: false,
            initialized: false,
        }
    }

    /// Returns the recorded state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the delay the next failure will be retried after.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry.current()
    }

    /// Returns whether a reconnect is scheduled.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }

    /// Returns whether the first watchdog tick has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Gives access to the transport for subscribe and publish.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotConnected`] unless the session is
    /// connected.
    pub fn transport(&mut self) -> Result<&mut dyn Transport, TransportError> {
        if self.state.is_connected() {
            Ok(self.transport.as_mut())
        } else {
            Err(TransportError::NotConnected)
        }
    }

    /// Opens a new transport, closing any existing one first.
    ///
    /// Cancels a pending reconnect and clears an earlier `disconnect`.
    pub fn connect(&mut self) {
        self.stopped = false;
        self.reconnect = None;
        self.open();
    }

    /// Closes the transport and stops retrying.
    pub fn disconnect(&mut self) {
        self.stopped = true;
        self.reconnect = None;
        self.resubscribe = None;
        self.close_transport();
        if self.state != ConnectionState::Disconnected {
            tracing::info!(session = %self.session_id, "Disconnected from broker");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Applies a status report from the transport.
    pub fn on_transport_status(&mut self, status: TransportStatus) {
        if self.stopped {
            tracing::debug!(session = %self.session_id, ?status, "Ignoring status after disconnect");
            return;
        }
        match status {
            TransportStatus::Connected => {
                tracing::info!(
                    session = %self.session_id,
                    host = %self.options.host,
                    port = self.options.port,
                    "Connected to broker"
                );
                self.state = ConnectionState::Connected;
                self.retry.reset();
                self.reconnect = None;
                self.resubscribe = Some(
                    self.scheduler
                        .schedule(RESUBSCRIBE_DELAY, TimerKind::Resubscribe),
                );
            }
            TransportStatus::Failed(reason)
                if self.state == ConnectionState::Disconnected && self.reconnect.is_some() =>
            {
                // Same outage, already handled by the watchdog or an earlier report.
                tracing::debug!(session = %self.session_id, %reason, "Reconnect already pending");
            }
            TransportStatus::Failed(reason) => {
                tracing::warn!(session = %self.session_id, %reason, "Broker connection failed");
                self.fail();
            }
        }
    }

    /// Handles a fired timer owned by this manager.
    ///
    /// Returns `true` when the resubscribe timer fired and the caller should
    /// subscribe to the base topic.
    pub fn on_timer(&mut self, event: &TimerEvent) -> bool {
        match event.kind {
            TimerKind::Reconnect if self.reconnect.as_ref().is_some_and(|t| t.fired(event)) => {
                self.reconnect = None;
                tracing::info!(session = %self.session_id, "Retrying broker connection");
                self.open();
                false
            }
            TimerKind::Resubscribe
                if self.resubscribe.as_ref().is_some_and(|t| t.fired(event)) =>
            {
                self.resubscribe = None;
                self.state.is_connected()
            }
            _ => false,
        }
    }

    /// Periodic liveness check.
    ///
    /// The first tick of a session always asks for a full initialize, since
    /// the transport may have been torn down without a status report. Later
    /// ticks compare the transport's live flag with the recorded state and
    /// schedule a reconnect on disagreement, unless one is already pending.
    pub fn watchdog(&mut self) -> WatchdogAction {
        if !self.initialized {
            self.initialized = true;
            tracing::debug!(session = %self.session_id, "Watchdog forcing initialize");
            return WatchdogAction::Initialize;
        }
        if self.stopped {
            return WatchdogAction::Idle;
        }

        let live = self.transport_open && self.transport.is_connected();
        if live == self.state.is_connected() || self.reconnect.is_some() {
            return WatchdogAction::Idle;
        }

        tracing::warn!(
            session = %self.session_id,
            live,
            recorded = %self.state,
            "Watchdog found stale connection state"
        );
        self.fail();
        WatchdogAction::Rearmed
    }

    fn open(&mut self) {
        self.close_transport();
        self.resubscribe = None;
        self.state = ConnectionState::Connecting;
        tracing::debug!(session = %self.session_id, host = %self.options.host, "Connecting");

        match self
            .transport
            .open(&self.options, self.transport_events.clone())
        {
            Ok(()) => self.transport_open = true,
            Err(e) => {
                tracing::warn!(session = %self.session_id, error = %e, "Could not open transport");
                self.fail();
            }
        }
    }

    fn fail(&mut self) {
        self.close_transport();
        self.resubscribe = None;
        self.state = ConnectionState::Disconnected;

        let delay = self.retry.next_delay();
        tracing::info!(
            session = %self.session_id,
            delay_secs = delay.as_secs(),
            "Scheduling reconnect"
        );
        self.reconnect = Some(self.scheduler.schedule(delay, TimerKind::Reconnect));
    }

    fn close_transport(&mut self) {
        if self.transport_open {
            self.transport.close();
            self.transport_open = false;
        }
    }
}
