// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crossbeam_channel::{Receiver, bounded};

use crate::state::ClockState;
use crate::{Result, Ticker, Timer, driver};

/// Provides an abstraction for time-related operations.
///
/// Working with time is notoriously difficult to test. Code that sleeps, waits for a deadline or
/// runs periodic work ends up slow and flaky in tests. Code that takes a `Clock` instead of
/// calling [`std::thread::sleep`] or [`SystemTime::now`] directly can be tested with a virtual
/// clock whose time moves only when the test says so.
///
/// The clock is used for:
///
/// - Retrieving the current absolute time via [`now()`][Self::now] and [`since()`][Self::since].
/// - Waiting for a duration via [`after()`][Self::after] and [`sleep()`][Self::sleep].
/// - Creating [`Timer`] and [`Ticker`] instances, and delayed callbacks via
///   [`after_fn()`][Self::after_fn].
///
/// # Clock construction
///
/// In production, use [`Clock::new_system`]. Its time follows the wall clock and a background
/// thread fires its timers.
///
/// In tests, the clock is constructed via [`ClockControl`][crate::ClockControl] or via
/// [`Clock::new_frozen`]. The passage of time is then controlled manually.
///
/// # Cloning and shared state
///
/// Cloning a clock is inexpensive (just an `Arc` clone) and every clone shares the same
/// underlying state, including pending wakeups and the controlled passage of time.
///
/// ```
/// use tock::Clock;
///
/// # fn use_clock(clock: &Clock) {
/// let clock_clone1 = clock.clone();
/// let clock_clone2 = clock.clone();
/// // All clones remain linked and observe the same timers and time control.
/// # }
/// ```
///
/// # Examples
///
/// ## Wait for a duration
///
/// ```
/// use std::thread;
/// use std::time::Duration;
///
/// use tock::ClockControl;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let worker = thread::spawn(move || {
///     let start = clock.now();
///     clock.sleep(Duration::from_secs(3600));
///     clock.since(start)
/// });
///
/// // An hour passes in an instant.
/// control.block_until(1);
/// control.advance(Duration::from_secs(3600));
///
/// assert_eq!(worker.join().unwrap(), Duration::from_secs(3600));
/// ```
///
/// ## Select over a wakeup
///
/// ```
/// use std::time::Duration;
///
/// use crossbeam_channel::select;
/// use tock::ClockControl;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let (_work, pending) = crossbeam_channel::bounded::<()>(1);
/// let deadline = clock.after(Duration::from_secs(5));
/// control.advance(Duration::from_secs(5));
///
/// select! {
///     recv(pending) -> _ => unreachable!(),
///     recv(deadline) -> _ => println!("timed out"),
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Clock(pub(crate) Arc<ClockState>);

impl Clock {
    /// Creates a clock that follows the wall clock.
    ///
    /// A background thread fires the timers of the clock every millisecond. The thread exits
    /// once the clock and everything created from it is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use tock::Clock;
    ///
    /// let clock = Clock::new_system();
    /// let start = clock.now();
    /// let fired_at = clock.after(Duration::from_millis(1)).recv().unwrap();
    ///
    /// assert!(fired_at > start);
    /// ```
    #[must_use]
    pub fn new_system() -> Self {
        let state = Arc::new(ClockState::new_system());
        driver::spawn(Arc::downgrade(&state));
        Self(state)
    }

    /// Creates a new frozen clock.
    ///
    /// This is a convenience method equivalent to calling `ClockControl::new().to_clock()`.
    ///
    /// > **Note**: The returned clock will not advance time; all time and timers are frozen.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use tock::Clock;
    ///
    /// let clock = Clock::new_frozen();
    /// let now = clock.now();
    ///
    /// std::thread::sleep(Duration::from_millis(1));
    ///
    /// assert_eq!(clock.now(), now);
    /// ```
    #[must_use]
    pub fn new_frozen() -> Self {
        crate::ClockControl::new().to_clock()
    }

    /// Creates a new frozen clock at the specified time.
    ///
    /// This is a convenience method equivalent to calling `ClockControl::new_at(time).to_clock()`.
    #[must_use]
    pub fn new_frozen_at(time: impl Into<SystemTime>) -> Self {
        crate::ClockControl::new_at(time).to_clock()
    }

    /// Returns the current time.
    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.0.now()
    }

    /// Returns the time elapsed since `earlier`.
    ///
    /// Returns [`Duration::ZERO`] if `earlier` lies in the future, which happens when a virtual
    /// clock was set backward.
    #[must_use]
    pub fn since(&self, earlier: SystemTime) -> Duration {
        self.now().duration_since(earlier).unwrap_or(Duration::ZERO)
    }

    /// Returns a channel that receives the current time once `duration` has elapsed.
    ///
    /// The wakeup cannot be cancelled. Use [`timer()`][Self::timer] when it must be stopped.
    /// A zero duration delivers before this method returns.
    #[must_use]
    pub fn after(&self, duration: Duration) -> Receiver<SystemTime> {
        let (sender, receiver) = bounded(1);
        let _timer = Timer::with_sender(self, duration, sender);
        receiver
    }

    /// Blocks the calling thread until `duration` has elapsed on this clock.
    ///
    /// On a virtual clock this returns only after the time has been advanced past the
    /// deadline.
    pub fn sleep(&self, duration: Duration) {
        // The sender lives in the clock until the wakeup fires.
        _ = self.after(duration).recv();
    }

    /// Creates a [`Timer`] that fires once `duration` has elapsed.
    #[must_use]
    pub fn timer(&self, duration: Duration) -> Timer {
        Timer::new(self, duration)
    }

    /// Creates a [`Timer`] that calls `callback` on its own thread once `duration` has elapsed.
    #[must_use]
    pub fn after_fn<F>(&self, duration: Duration, callback: F) -> Timer
    where
        F: Fn() + Send + Sync + 'static,
    {
        Timer::after_fn(self, duration, callback)
    }

    /// Creates a [`Ticker`] that ticks every `period`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, or if the background thread of the ticker cannot be spawned.
    #[must_use]
    pub fn ticker(&self, period: Duration) -> Ticker {
        Ticker::new(self, period)
    }

    /// Creates a [`Ticker`] that ticks every `period`.
    ///
    /// # Errors
    ///
    /// Returns an error if `period` is zero or the background thread cannot be spawned.
    pub fn try_ticker(&self, period: Duration) -> Result<Ticker> {
        Ticker::try_new(self, period)
    }

    pub(crate) fn state(&self) -> &ClockState {
        &self.0
    }
}
