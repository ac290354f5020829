// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::Clock;
use crate::state::ClockState;

/// Seconds between the UNIX epoch and 1984-04-04T00:00:00Z, the default start of a virtual clock.
const DEFAULT_START_SECS: u64 = 449_884_800;

/// Controls the flow of time in tests.
///
/// Time of a clock created by `ClockControl` never moves on its own. It moves only when
/// [`advance`][Self::advance] or [`set`][Self::set] is called, and every wakeup whose deadline
/// is reached fires before these methods return.
///
/// To create a [`Clock`] from `ClockControl`, use the [`ClockControl::to_clock`] method. The
/// clock is handed to the code under test while the test keeps the `ClockControl`.
///
/// # Examples
///
/// ## Advancing time manually
///
/// ```
/// use std::time::Duration;
///
/// use tock::ClockControl;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
///
/// let now = clock.now();
///
/// // Advance the time by one second
/// control.advance(Duration::from_secs(1));
///
/// assert_eq!(clock.since(now), Duration::from_secs(1));
/// ```
///
/// ## Waiting for a thread to go to sleep
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
/// let sleeper = thread::spawn(move || clock.sleep(Duration::from_secs(60)));
///
/// // Wait until the thread is asleep, then wake it up.
/// control.block_until(1);
/// control.advance(Duration::from_secs(60));
///
/// sleeper.join().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ClockControl {
    // Shared with every clock and timer created from this control, across threads.
    state: Arc<ClockState>,
}

impl Default for ClockControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockControl {
    /// Creates a new `ClockControl` instance.
    ///
    /// The initial time is 1984-04-04T00:00:00Z, an arbitrary point that is not the UNIX epoch.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::SystemTime;
    ///
    /// use tock::ClockControl;
    ///
    /// let control = ClockControl::new();
    ///
    /// assert!(control.now() > SystemTime::UNIX_EPOCH);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::new_at(SystemTime::UNIX_EPOCH + Duration::from_secs(DEFAULT_START_SECS))
    }

    /// Creates a new `ClockControl` instance at the specified time.
    ///
    /// Anything convertible into [`SystemTime`] is accepted, such as `jiff::Timestamp`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    ///
    /// use tock::ClockControl;
    ///
    /// let start = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
    /// let control = ClockControl::new_at(start);
    ///
    /// assert_eq!(control.to_clock().now(), start);
    /// ```
    #[must_use]
    pub fn new_at(time: impl Into<SystemTime>) -> Self {
        Self {
            state: Arc::new(ClockState::new_manual(time.into())),
        }
    }

    /// Converts the `ClockControl` to a `Clock` instance.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock(Arc::clone(&self.state))
    }

    /// Returns the current time of the controlled clock.
    #[must_use]
    pub fn now(&self) -> SystemTime {
        self.state.now()
    }

    /// Manually advances the clock by the specified duration.
    ///
    /// Every wakeup whose deadline is reached fires before this method returns. Wakeups that
    /// become due together fire in no particular order. Delayed callbacks run on their own
    /// threads and may still be running when this method returns.
    ///
    /// # Panics
    ///
    /// Panics if the resulting time cannot be represented by [`SystemTime`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use tock::ClockControl;
    ///
    /// let control = ClockControl::new();
    /// let wakeup = control.to_clock().after(Duration::from_secs(1));
    ///
    /// control.advance(Duration::from_secs(1));
    ///
    /// assert!(wakeup.try_recv().is_ok());
    /// ```
    pub fn advance(&self, duration: Duration) {
        self.state.advance(duration);
    }

    /// Manually advances the clock by the specified number of milliseconds.
    ///
    /// # Panics
    ///
    /// Panics if the resulting time cannot be represented by [`SystemTime`].
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Sets the clock to the specified time.
    ///
    /// The time can move forward or backward. Every wakeup whose deadline is at or before
    /// `time` fires before this method returns. Moving backward fires nothing that is still
    /// in the future of `time`, and never revokes a wakeup that already fired.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::{Duration, SystemTime};
    ///
    /// use tock::ClockControl;
    ///
    /// let control = ClockControl::new();
    /// let target = SystemTime::UNIX_EPOCH + Duration::from_secs(5);
    ///
    /// control.set(target);
    ///
    /// assert_eq!(control.now(), target);
    /// ```
    pub fn set(&self, time: impl Into<SystemTime>) {
        self.state.set(time.into());
    }

    /// Blocks the calling thread until exactly `sleepers` wakeups are pending on the clock.
    ///
    /// Pending wakeups are created by [`Clock::after`], [`Clock::sleep`], timers and tickers,
    /// and leave when they fire or are stopped. The count is observed after every change, so
    /// this method returns only once a change lands exactly on `sleepers`. A single advance
    /// that fires several wakeups at once skips the counts in between.
    ///
    /// Returns immediately if the count already matches.
    pub fn block_until(&self, sleepers: usize) {
        self.state.block_until(sleepers);
    }

    #[cfg(test)]
    pub(crate) fn sleepers_len(&self) -> usize {
        self.state.sleepers_len()
    }
}

impl From<ClockControl> for Clock {
    fn from(control: ClockControl) -> Self {
        control.to_clock()
    }
}

impl From<&ClockControl> for Clock {
    fn from(control: &ClockControl) -> Self {
        control.to_clock()
    }
}
