// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crossbeam_channel::{Receiver, Sender, bounded};

/// A thread waiting for the waiting set to hold exactly `target` sleepers.
#[derive(Debug)]
pub(crate) struct Blocker {
    target: usize,
    signal: Sender<()>,
}

impl Blocker {
    /// Creates a blocker together with the receiver its owner waits on.
    pub fn new(target: usize) -> (Self, Receiver<()>) {
        let (signal, waiter) = bounded(1);
        (Self { target, signal }, waiter)
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Releases the waiting thread. Consuming the blocker makes the signal one-shot.
    fn signal(self) {
        // The waiter may already be gone, in which case there is nobody to release.
        _ = self.signal.try_send(());
    }
}

/// Signals every blocker whose target equals `count` and returns the ones still waiting.
pub(crate) fn notify_blockers(blockers: Vec<Blocker>, count: usize) -> Vec<Blocker> {
    let mut waiting = Vec::with_capacity(blockers.len());

    for blocker in blockers {
        if blocker.target() == count {
            tracing::event!(
                name: "tock.blocker.signaled",
                tracing::Level::DEBUG,
                sleepers = count,
                "blocker released"
            );
            blocker.signal();
        } else {
            waiting.push(blocker);
        }
    }

    waiting
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::LogCapture;

    const TEST_TIMEOUT: Duration = Duration::from_secs(1);

    #[test]
    fn notify_blockers_releases_exact_matches() {
        let (b1, w1) = Blocker::new(1);
        let (b2, w2) = Blocker::new(2);
        let (b3, w3) = Blocker::new(5);
        let (b4, w4) = Blocker::new(10);
        let (b5, w5) = Blocker::new(10);

        let blockers = notify_blockers(vec![b1, b2, b3, b4, b5], 2);
        assert_eq!(blockers.len(), 4);
        w2.recv_timeout(TEST_TIMEOUT).unwrap();

        let blockers = notify_blockers(blockers, 10);
        assert_eq!(blockers.len(), 2);
        w4.recv_timeout(TEST_TIMEOUT).unwrap();
        w5.recv_timeout(TEST_TIMEOUT).unwrap();

        // Nobody else was released.
        assert!(w1.try_recv().is_err());
        assert!(w3.try_recv().is_err());
        assert_eq!(
            blockers.iter().map(Blocker::target).collect::<Vec<_>>(),
            vec![1, 5]
        );
    }

    #[test]
    fn notify_blockers_no_match_keeps_all() {
        let (b1, w1) = Blocker::new(3);

        let blockers = notify_blockers(vec![b1], 4);

        assert_eq!(blockers.len(), 1);
        assert!(w1.try_recv().is_err());
    }

    #[test]
    fn signal_without_waiter_is_ignored() {
        let (blocker, waiter) = Blocker::new(0);
        drop(waiter);

        assert!(notify_blockers(vec![blocker], 0).is_empty());
    }

    #[test]
    fn notify_blockers_logs_release() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());
        let (blocker, _waiter) = Blocker::new(7);

        _ = notify_blockers(vec![blocker], 7);

        capture.assert_contains("blocker released");
        capture.assert_contains("sleepers=7");
    }
}
