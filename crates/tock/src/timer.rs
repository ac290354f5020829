// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::Clock;
use crate::sleeper::{Delivery, Sleeper, deadline_after};

/// A single-shot wakeup that can be stopped and reset.
///
/// A timer is created with [`Timer::new()`] or [`Clock::timer()`]. Once its duration has elapsed
/// on the clock, the firing time is sent to the channel returned by [`Timer::receiver()`]. The
/// channel holds at most one value.
///
/// A timer created with [`Timer::after_fn()`] or [`Clock::after_fn()`] has no channel; it runs a
/// callback on its own thread instead.
///
/// Dropping the handle does not cancel the timer. Clones share the same underlying timer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tock::ClockControl;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let timer = clock.timer(Duration::from_secs(5));
/// control.advance(Duration::from_secs(5));
///
/// assert!(timer.receiver().unwrap().try_recv().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Timer {
    clock: Clock,
    sleeper: Arc<Sleeper>,
    receiver: Option<Receiver<SystemTime>>,
}

impl Timer {
    /// Creates a timer that sends the current time on its channel once `duration` has elapsed.
    ///
    /// A zero duration fires before this method returns.
    ///
    /// > **Note**: Consider using [`Clock::timer()`] as a shortcut for creating timers.
    #[must_use]
    pub fn new(clock: &Clock, duration: Duration) -> Self {
        let (sender, receiver) = bounded(1);
        let mut timer = Self::with_sender(clock, duration, sender);
        timer.receiver = Some(receiver);
        timer
    }

    /// Creates a timer that calls `callback` on a new thread once `duration` has elapsed.
    ///
    /// The clock never waits for the callback to finish. Resetting a fired timer arms it again
    /// and the callback runs once more on the next fire.
    ///
    /// > **Note**: Consider using [`Clock::after_fn()`] as a shortcut.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::mpsc;
    /// use std::time::Duration;
    ///
    /// use tock::{ClockControl, Timer};
    ///
    /// let control = ClockControl::new();
    /// let (sender, receiver) = mpsc::channel();
    ///
    /// let _timer = Timer::after_fn(&control.to_clock(), Duration::from_secs(1), move || {
    ///     sender.send("called").unwrap();
    /// });
    ///
    /// control.advance(Duration::from_secs(1));
    /// assert_eq!(receiver.recv().unwrap(), "called");
    /// ```
    #[must_use]
    pub fn after_fn<F>(clock: &Clock, duration: Duration, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::register(clock, duration, Delivery::Callback(Arc::new(callback)))
    }

    /// Creates a timer delivering into a channel owned by the caller.
    pub(crate) fn with_sender(clock: &Clock, duration: Duration, sender: Sender<SystemTime>) -> Self {
        Self::register(clock, duration, Delivery::Send(sender))
    }

    fn register(clock: &Clock, duration: Duration, delivery: Delivery) -> Self {
        let sleeper = Arc::new(Sleeper::new(deadline_after(clock.now(), duration), delivery));
        clock.state().register(Arc::clone(&sleeper));

        Self {
            clock: clock.clone(),
            sleeper,
            receiver: None,
        }
    }

    /// Returns the channel the firing time is sent to, or `None` for callback timers.
    #[must_use]
    pub fn receiver(&self) -> Option<&Receiver<SystemTime>> {
        self.receiver.as_ref()
    }

    /// Consumes the handle and returns its channel, or `None` for callback timers.
    ///
    /// The timer keeps running.
    #[must_use]
    pub fn into_receiver(self) -> Option<Receiver<SystemTime>> {
        self.receiver
    }

    /// Prevents the timer from firing.
    ///
    /// Returns `true` if the call stopped the timer, or `false` if it had already fired or been
    /// stopped. Stopping does not drain the channel.
    ///
    /// The timer leaves the waiting set of the clock before this method returns, so threads in
    /// [`ClockControl::block_until`][crate::ClockControl::block_until] observe the new count.
    pub fn stop(&self) -> bool {
        let stopped = self.sleeper.disarm();

        if stopped {
            // An expired deadline makes the next scan remove the sleeper.
            self.sleeper.set_deadline(Some(self.clock.now()));
            self.clock.state().advance(Duration::ZERO);
        }

        tracing::event!(name: "tock.timer.stop", tracing::Level::TRACE, stopped, "timer stopped");

        stopped
    }

    /// Arms the timer to fire once `duration` has elapsed from now.
    ///
    /// Returns `true` if the timer was still pending, or `false` if it had already fired or been
    /// stopped. A pending timer is stopped first. A zero duration fires before this method returns.
    pub fn reset(&self, duration: Duration) -> bool {
        let active = self.stop();

        self.sleeper.set_deadline(deadline_after(self.clock.now(), duration));
        self.sleeper.rearm();
        self.clock.state().register(Arc::clone(&self.sleeper));

        active
    }
}
