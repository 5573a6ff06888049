// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cancellable timers owned by a session.
//!
//! A timer is a tokio task that sleeps and then posts a [`TimerEvent`] into
//! the session inbox. Dropping the [`ScheduledTask`] aborts the sleep, so a
//! torn-down session cannot leave timers behind. An event that was already
//! posted before cancellation is recognised as stale by its id.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What a timer asks the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    /// Retry the broker connection.
    Reconnect,
    /// Subscribe to the base topic after a successful connect.
    Resubscribe,
    /// Turn verbose logging back off.
    DebugLoggingExpired,
    /// Ask a newly claimed device for its current state.
    RequestState {
        /// IEEE address of the device.
        ieee_address: String,
    },
}

/// A fired timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerEvent {
    /// Id of the [`ScheduledTask`] that fired.
    pub id: u64,
    /// What to do.
    pub kind: TimerKind,
}

/// Creates timers that post into one inbox.
#[derive(Debug, Clone)]
pub struct Scheduler {
    sender: mpsc::UnboundedSender<TimerEvent>,
    next_id: Arc<AtomicU64>,
}

impl Scheduler {
    /// Creates a scheduler and the receiving end of its inbox.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            sender,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (scheduler, receiver)
    }

    /// Posts `kind` after `delay`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use = "dropping the task cancels the timer"]
    pub fn schedule(&self, delay: Duration, kind: TimerKind) -> ScheduledTask {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let sender = self.sender.clone();
        tracing::trace!(id, ?kind, delay_ms = delay.as_millis(), "Timer scheduled");
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The session may already be gone.
            let _ = sender.send(TimerEvent { id, kind });
        });
        ScheduledTask { id, handle }
    }
}

/// A pending timer. Aborted when dropped.
#[derive(Debug)]
pub struct ScheduledTask {
    id: u64,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Returns the id carried by the event this timer posts.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns whether `event` was posted by this timer.
    #[must_use]
    pub fn fired(&self, event: &TimerEvent) -> bool {
        self.id == event.id
    }

    /// Cancels the timer.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (scheduler, mut rx) = Scheduler::new();
        let task = scheduler.schedule(Duration::from_secs(4), TimerKind::Resubscribe);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());

        let event = rx.recv().await.unwrap();
        assert!(task.fired(&event));
        assert_eq!(event.kind, TimerKind::Resubscribe);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (scheduler, mut rx) = Scheduler::new();
        let task = scheduler.schedule(Duration::from_secs(5), TimerKind::Reconnect);
        task.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_timer_never_fires() {
        let (scheduler, mut rx) = Scheduler::new();
        {
            let _task = scheduler.schedule(Duration::from_secs(1), TimerKind::DebugLoggingExpired);
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn ids_are_unique() {
        let (scheduler, _rx) = Scheduler::new();
        let a = scheduler.schedule(Duration::from_secs(1), TimerKind::Reconnect);
        let b = scheduler.clone().schedule(Duration::from_secs(1), TimerKind::Reconnect);
        assert_ne!(a.id(), b.id());
    }
}
