// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, SystemTime};

use crossbeam_channel::{Sender, TrySendError};
use parking_lot::RwLock;

/// Callback invoked by a delayed-callback timer.
pub(crate) type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// What happens when a sleeper fires.
pub(crate) enum Delivery {
    /// Pushes the firing time into a bounded single-slot channel without blocking.
    Send(Sender<SystemTime>),

    /// Runs the callback on its own detached thread.
    Callback(Callback),
}

impl Delivery {
    fn deliver(&self, now: SystemTime) {
        match self {
            Self::Send(sender) => match sender.try_send(now) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::event!(
                        name: "tock.sleeper.dropped",
                        tracing::Level::TRACE,
                        "wakeup dropped, the previous one was not consumed yet"
                    );
                }
                // Nobody listens anymore; the wakeup has nowhere to go.
                Err(TrySendError::Disconnected(_)) => {}
            },
            Self::Callback(callback) => {
                let callback = Arc::clone(callback);
                let spawned = thread::Builder::new()
                    .name("tock-callback".to_string())
                    .spawn(move || callback());

                if let Err(error) = spawned {
                    tracing::event!(
                        name: "tock.sleeper.callback_failed",
                        tracing::Level::ERROR,
                        error = %error,
                        "failed to spawn the thread for a delayed callback"
                    );
                }
            }
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send(_) => f.write_str("Send"),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// A single pending wakeup request.
///
/// The fired guard is the only authority on whether the sleeper has delivered. Stopping a
/// timer and firing it from a scan of the waiting set both go through [`Sleeper::disarm`],
/// so at most one of them wins.
#[derive(Debug)]
pub(crate) struct Sleeper {
    /// When the sleeper becomes eligible to fire. `None` is never.
    ///
    /// Locked separately from the registry because timers rewrite it while a scan
    /// of the waiting set may be running.
    deadline: RwLock<Option<SystemTime>>,
    fired: AtomicBool,
    delivery: Delivery,
}

impl Sleeper {
    pub fn new(deadline: Option<SystemTime>, delivery: Delivery) -> Self {
        Self {
            deadline: RwLock::new(deadline),
            fired: AtomicBool::new(false),
            delivery,
        }
    }

    pub fn deadline(&self) -> Option<SystemTime> {
        *self.deadline.read()
    }

    pub fn set_deadline(&self, deadline: Option<SystemTime>) {
        *self.deadline.write() = deadline;
    }

    /// Whether the deadline has been reached at `now`.
    pub fn is_due(&self, now: SystemTime) -> bool {
        self.deadline().is_some_and(|deadline| deadline <= now)
    }

    /// Moves the guard from pending to fired.
    ///
    /// Returns `true` only for the caller that performed the transition.
    pub fn disarm(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves the guard back to pending so the sleeper can fire again.
    pub fn rearm(&self) {
        self.fired.store(false, Ordering::Release);
    }

    /// Delivers the wakeup unless the sleeper already fired or was stopped.
    pub fn fire(&self, now: SystemTime) -> bool {
        if !self.disarm() {
            return false;
        }

        self.delivery.deliver(now);
        true
    }
}

/// Computes the deadline `duration` after `now`, or `None` if it lies beyond the supported range.
pub(crate) fn deadline_after(now: SystemTime, duration: Duration) -> Option<SystemTime> {
    now.checked_add(duration)
}
