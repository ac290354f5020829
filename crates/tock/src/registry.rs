// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::mem;
use std::sync::Arc;
use std::time::SystemTime;

use crossbeam_channel::Receiver;

use crate::blocker::{Blocker, notify_blockers};
use crate::sleeper::Sleeper;

/// The waiting set of sleepers and the blockers observing its size.
///
/// The waiting set is unordered. A scan fires every sleeper whose deadline has been
/// reached in no particular order, and blockers are re-evaluated after every mutation
/// of the waiting set.
#[derive(Debug)]
pub(crate) struct Registry {
    now: SystemTime,
    sleepers: Vec<Arc<Sleeper>>,
    blockers: Vec<Blocker>,
}

impl Registry {
    pub fn new(now: SystemTime) -> Self {
        Self {
            now,
            sleepers: Vec::new(),
            blockers: Vec::new(),
        }
    }

    pub fn now(&self) -> SystemTime {
        self.now
    }

    /// Number of sleepers in the waiting set.
    pub fn len(&self) -> usize {
        self.sleepers.len()
    }

    /// Adds a sleeper to the waiting set, or fires it right away if its deadline was reached.
    ///
    /// A sleeper that is already waiting is not added twice.
    pub fn register(&mut self, sleeper: Arc<Sleeper>, now: SystemTime) {
        if sleeper.is_due(now) {
            tracing::event!(name: "tock.sleeper.immediate", tracing::Level::TRACE, "sleeper due on registration");
            sleeper.fire(now);
            return;
        }

        if !self.sleepers.iter().any(|waiting| Arc::ptr_eq(waiting, &sleeper)) {
            self.sleepers.push(sleeper);
        }

        tracing::event!(
            name: "tock.sleeper.registered",
            tracing::Level::TRACE,
            sleepers = self.sleepers.len(),
            "sleeper registered"
        );

        self.notify_blockers();
    }

    /// Moves the time to `now`, firing every sleeper whose deadline has been reached.
    ///
    /// Returns the number of sleepers that delivered a wakeup. Sleepers stopped in the
    /// meantime are removed without delivering.
    pub fn set(&mut self, now: SystemTime) -> usize {
        let (due, pending): (Vec<_>, Vec<_>) = mem::take(&mut self.sleepers)
            .into_iter()
            .partition(|sleeper| sleeper.is_due(now));

        self.sleepers = pending;
        let fired = due.iter().filter(|sleeper| sleeper.fire(now)).count();

        self.notify_blockers();
        self.now = now;

        if fired > 0 {
            tracing::event!(
                name: "tock.clock.fired",
                tracing::Level::DEBUG,
                fired,
                sleepers = self.sleepers.len(),
                "sleepers fired"
            );
        }

        fired
    }

    /// Registers interest in the waiting set holding exactly `target` sleepers.
    ///
    /// Returns `None` when the waiting set already has that size. Otherwise returns the
    /// receiver that is signaled once the size is reached.
    pub fn block_on(&mut self, target: usize) -> Option<Receiver<()>> {
        if self.sleepers.len() == target {
            return None;
        }

        let (blocker, waiter) = Blocker::new(target);
        self.blockers.push(blocker);

        Some(waiter)
    }

    fn notify_blockers(&mut self) {
        if self.blockers.is_empty() {
            return;
        }

        self.blockers = notify_blockers(mem::take(&mut self.blockers), self.sleepers.len());
    }

    #[cfg(test)]
    pub fn blockers_len(&self) -> usize {
        self.blockers.len()
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::bounded;

    use super::*;
    use crate::sleeper::Delivery;

    fn sleeper(deadline: SystemTime) -> (Arc<Sleeper>, Receiver<SystemTime>) {
        let (sender, receiver) = bounded(1);
        (Arc::new(Sleeper::new(Some(deadline), Delivery::Send(sender))), receiver)
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn register_due_fires_immediately() {
        let mut registry = Registry::new(at(10));
        let (sleeper, receiver) = sleeper(at(10));

        registry.register(sleeper, at(10));

        assert_eq!(registry.len(), 0);
        assert_eq!(receiver.try_recv().unwrap(), at(10));
    }

    #[test]
    fn register_pending_waits() {
        let mut registry = Registry::new(at(10));
        let (sleeper, receiver) = sleeper(at(11));

        registry.register(sleeper, at(10));

        assert_eq!(registry.len(), 1);
        assert!(receiver.is_empty());
    }

    #[test]
    fn register_same_sleeper_twice_counts_once() {
        let mut registry = Registry::new(at(10));
        let (sleeper, _receiver) = sleeper(at(11));

        registry.register(Arc::clone(&sleeper), at(10));
        registry.register(sleeper, at(10));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn set_fires_due_only() {
        let mut registry = Registry::new(at(0));
        let (first, first_rx) = sleeper(at(1));
        let (second, second_rx) = sleeper(at(2));
        let (third, third_rx) = sleeper(at(3));
        registry.register(first, at(0));
        registry.register(second, at(0));
        registry.register(third, at(0));

        let fired = registry.set(at(2));

        assert_eq!(fired, 2);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.now(), at(2));
        assert_eq!(first_rx.try_recv().unwrap(), at(2));
        assert_eq!(second_rx.try_recv().unwrap(), at(2));
        assert!(third_rx.is_empty());
    }

    #[test]
    fn set_backwards_fires_nothing() {
        let mut registry = Registry::new(at(100));
        let (sleeper, receiver) = sleeper(at(150));
        registry.register(sleeper, at(100));

        let fired = registry.set(at(50));

        assert_eq!(fired, 0);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.now(), at(50));
        assert!(receiver.is_empty());
    }

    #[test]
    fn set_removes_disarmed_without_delivery() {
        let mut registry = Registry::new(at(0));
        let (sleeper, receiver) = sleeper(at(1));
        registry.register(Arc::clone(&sleeper), at(0));
        assert!(sleeper.disarm());

        let fired = registry.set(at(1));

        assert_eq!(fired, 0);
        assert_eq!(registry.len(), 0);
        assert!(receiver.is_empty());
    }

    #[test]
    fn block_on_fast_path() {
        let mut registry = Registry::new(at(0));

        assert!(registry.block_on(0).is_none());
        assert_eq!(registry.blockers_len(), 0);
    }

    #[test]
    fn block_on_released_by_register() {
        let mut registry = Registry::new(at(0));
        let waiter = registry.block_on(1).unwrap();
        assert_eq!(registry.blockers_len(), 1);

        let (sleeper, _receiver) = sleeper(at(1));
        registry.register(sleeper, at(0));

        assert!(waiter.try_recv().is_ok());
        assert_eq!(registry.blockers_len(), 0);
    }

    #[test]
    fn block_on_released_by_set() {
        let mut registry = Registry::new(at(0));
        let (sleeper, _receiver) = sleeper(at(1));
        registry.register(sleeper, at(0));
        let waiter = registry.block_on(0).unwrap();

        registry.set(at(1));

        assert!(waiter.try_recv().is_ok());
        assert_eq!(registry.blockers_len(), 0);
    }

    #[test]
    fn block_on_skipped_size_stays_blocked() {
        let mut registry = Registry::new(at(0));
        let (first, _first_rx) = sleeper(at(1));
        let (second, _second_rx) = sleeper(at(1));
        registry.register(first, at(0));
        registry.register(second, at(0));
        let waiter = registry.block_on(1).unwrap();

        // Both sleepers leave in one step: the size goes from 2 to 0 and never equals 1.
        registry.set(at(1));

        assert!(waiter.try_recv().is_err());
        assert_eq!(registry.blockers_len(), 1);
    }
}
