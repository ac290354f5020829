// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::RwLock;

use crate::registry::Registry;
use crate::sleeper::Sleeper;

/// Where a clock takes its current time from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeSource {
    /// Time moves only when a [`ClockControl`][crate::ClockControl] moves it.
    Manual,

    /// Time follows the wall clock; a driver thread keeps firing due sleepers.
    System,
}

/// State shared by every [`Clock`][crate::Clock], [`ClockControl`][crate::ClockControl] and
/// timer created from the same clock.
#[derive(Debug)]
pub(crate) struct ClockState {
    source: TimeSource,

    // Every mutation of the waiting set or the blockers takes the write lock. Reading the
    // manual time takes the read lock. Delivery actions run under the write lock, so they
    // must never block or call back into the clock on the same thread.
    registry: RwLock<Registry>,
}

impl ClockState {
    pub fn new_manual(start: SystemTime) -> Self {
        Self {
            source: TimeSource::Manual,
            registry: RwLock::new(Registry::new(start)),
        }
    }

    pub fn new_system() -> Self {
        Self {
            source: TimeSource::System,
            registry: RwLock::new(Registry::new(SystemTime::now())),
        }
    }

    #[cfg(test)]
    pub fn source(&self) -> TimeSource {
        self.source
    }

    pub fn now(&self) -> SystemTime {
        match self.source {
            TimeSource::Manual => self.registry.read().now(),
            TimeSource::System => SystemTime::now(),
        }
    }

    pub fn register(&self, sleeper: Arc<Sleeper>) {
        let mut registry = self.registry.write();
        let now = self.current(&registry);
        registry.register(sleeper, now);
    }

    /// Moves the time to `time` and fires every sleeper that became due.
    pub fn set(&self, time: SystemTime) {
        let mut registry = self.registry.write();
        let fired = registry.set(time);

        tracing::event!(
            name: "tock.clock.set",
            tracing::Level::DEBUG,
            fired,
            sleepers = registry.len(),
            "clock set"
        );
    }

    /// Moves the time forward by `delta` and fires every sleeper that became due.
    ///
    /// A zero delta re-scans the waiting set without moving the time, which removes stopped
    /// sleepers and lets blockers observe the new size.
    pub fn advance(&self, delta: Duration) {
        let mut registry = self.registry.write();
        let target = self
            .current(&registry)
            .checked_add(delta)
            .expect(OUTSIDE_RANGE_MESSAGE);

        let fired = registry.set(target);

        // Zero deltas come from the system driver and from stopped timers on every re-scan.
        if !delta.is_zero() {
            tracing::event!(
                name: "tock.clock.advance",
                tracing::Level::DEBUG,
                delta.ms = delta.as_millis(),
                fired,
                sleepers = registry.len(),
                "clock advanced"
            );
        }
    }

    /// Blocks the calling thread until the waiting set holds exactly `target` sleepers.
    pub fn block_until(&self, target: usize) {
        // The lock must be released before waiting, otherwise nobody could ever change the size.
        let waiter = self.registry.write().block_on(target);

        if let Some(waiter) = waiter {
            tracing::event!(
                name: "tock.blocker.waiting",
                tracing::Level::DEBUG,
                target,
                "waiting for sleepers"
            );

            // Both a signal and a dropped sender mean the blocker was released.
            _ = waiter.recv();
        }
    }

    pub fn sleepers_len(&self) -> usize {
        self.registry.read().len()
    }

    fn current(&self, registry: &Registry) -> SystemTime {
        match self.source {
            TimeSource::Manual => registry.now(),
            TimeSource::System => SystemTime::now(),
        }
    }
}

pub(crate) static OUTSIDE_RANGE_MESSAGE: &str = "moving the clock outside of the range supported by SystemTime is not possible";

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::thread;

    use crossbeam_channel::bounded;

    use super::*;
    use crate::sleeper::Delivery;

    const TEST_TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn clock_state_send_and_sync() {
        static_assertions::assert_impl_all!(ClockState: Send, Sync);
    }

    #[test]
    fn manual_now_follows_set() {
        let state = ClockState::new_manual(SystemTime::UNIX_EPOCH);
        let target = SystemTime::UNIX_EPOCH + Duration::from_secs(42);

        state.set(target);

        assert_eq!(state.now(), target);
        assert_eq!(state.source(), TimeSource::Manual);
    }

    #[test]
    fn manual_advance_zero_keeps_time() {
        let state = ClockState::new_manual(SystemTime::UNIX_EPOCH);

        state.advance(Duration::ZERO);

        assert_eq!(state.now(), SystemTime::UNIX_EPOCH);
    }

    #[test]
    #[should_panic]
    fn advance_outside_range_panics() {
        let state = ClockState::new_manual(SystemTime::UNIX_EPOCH);

        state.advance(Duration::MAX);
    }

    #[test]
    fn system_now_follows_wall_clock() {
        let before = SystemTime::now();
        let state = ClockState::new_system();

        assert!(state.now() >= before);
        assert_eq!(state.source(), TimeSource::System);
    }

    #[test]
    fn system_advance_zero_fires_past_deadline() {
        let state = ClockState::new_system();
        let (sender, receiver) = bounded(1);
        let deadline = SystemTime::now() + Duration::from_millis(1);
        state.register(Arc::new(Sleeper::new(Some(deadline), Delivery::Send(sender))));

        thread::sleep(Duration::from_millis(2));
        state.advance(Duration::ZERO);

        assert!(receiver.try_recv().is_ok());
        assert_eq!(state.sleepers_len(), 0);
    }

    #[test]
    fn block_until_released_from_other_thread() {
        let state = Arc::new(ClockState::new_manual(SystemTime::UNIX_EPOCH));
        let (done, finished) = bounded(1);

        let waiter_state = Arc::clone(&state);
        let waiter = thread::spawn(move || {
            waiter_state.block_until(1);
            done.send(()).unwrap();
        });

        let (sender, _receiver) = bounded(1);
        let deadline = SystemTime::UNIX_EPOCH + Duration::from_secs(1);
        state.register(Arc::new(Sleeper::new(Some(deadline), Delivery::Send(sender))));

        finished.recv_timeout(TEST_TIMEOUT).unwrap();
        waiter.join().unwrap();
    }
}
