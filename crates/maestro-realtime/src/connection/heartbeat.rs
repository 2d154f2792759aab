//! Liveness monitor
//!
//! Best-effort keep-alive: sends a heartbeat frame at a fixed interval while
//! the connection is up, so idle connections are not reaped and silent death
//! eventually surfaces as a transport error. The monitor never declares the
//! connection dead itself.

use crate::protocol::ClientFrame;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Periodic heartbeat emitter
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    /// Create a stopped monitor with the given tick interval
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    /// Start ticking into the connection's outbound channel
    ///
    /// Replaces any previous run. The task ends on its own once the outbound
    /// channel closes, i.e. once the connection is gone.
    pub fn start(&self, outbound: mpsc::Sender<ClientFrame>) {
        self.stop();

        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately; the
            // connection just opened, so skip it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if outbound.send(ClientFrame::heartbeat()).await.is_err() {
                    tracing::trace!("Outbound channel closed; heartbeat task exiting");
                    break;
                }
                tracing::trace!("Heartbeat sent");
            }
        });

        *self.task.lock() = Some(handle);
    }

    /// Stop ticking; idempotent, safe to call when not started
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    /// Whether the monitor currently has a running task
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
