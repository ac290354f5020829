// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};
use parking_lot::Mutex;

use crate::{Clock, Error, Result, Timer};

/// A wakeup that repeats every period.
///
/// A ticker owns a background thread for its entire lifetime. Every time its internal
/// [`Timer`] fires, the thread pushes the firing time into the channel returned by
/// [`Ticker::receiver()`] and arms the timer again one period ahead.
///
/// The channel holds at most one tick. A consumer that falls behind misses ticks instead of
/// accumulating a backlog.
///
/// The ticker counts as one pending sleeper of its clock from the moment it is created until
/// it is stopped. Dropping the ticker stops it.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tock::ClockControl;
///
/// let control = ClockControl::new();
/// let ticker = control.to_clock().ticker(Duration::from_secs(1));
///
/// control.advance(Duration::from_secs(1));
/// let first = ticker.receiver().recv().unwrap();
///
/// // Wait until the ticker armed itself for the next period.
/// control.block_until(1);
/// control.advance(Duration::from_secs(1));
/// let second = ticker.receiver().recv().unwrap();
///
/// assert_eq!(second.duration_since(first).unwrap(), Duration::from_secs(1));
/// ```
#[derive(Debug)]
pub struct Ticker {
    receiver: Receiver<SystemTime>,
    stop: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Ticker {
    /// Creates a ticker that ticks every `period`.
    ///
    /// > **Note**: Consider using [`Clock::ticker()`] as a shortcut for creating tickers.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero, or if the background thread cannot be spawned. Use
    /// [`Ticker::try_new()`] to receive an error instead.
    #[expect(
        clippy::panic,
        reason = "a zero period is a programming error and must surface right at the call site"
    )]
    #[must_use]
    pub fn new(clock: &Clock, period: Duration) -> Self {
        match Self::try_new(clock, period) {
            Ok(ticker) => ticker,
            Err(error) => panic!("{error}"),
        }
    }

    /// Creates a ticker that ticks every `period`.
    ///
    /// # Errors
    ///
    /// Returns an error if `period` is zero or the background thread cannot be spawned.
    pub fn try_new(clock: &Clock, period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::non_positive_period());
        }

        let (ticks, receiver) = bounded(1);
        let (stop, stopped) = bounded(1);
        let (fired_sender, fired) = bounded(1);

        // Registered before the thread starts so the ticker is counted as soon as we return.
        let timer = Timer::with_sender(clock, period, fired_sender);
        let worker_timer = timer.clone();

        let worker = thread::Builder::new()
            .name("tock-ticker".to_string())
            .spawn(move || run(&worker_timer, &fired, &ticks, &stopped, period))
            .map_err(|error| {
                timer.stop();
                Error::spawn(error)
            })?;

        tracing::event!(
            name: "tock.ticker.started",
            tracing::Level::DEBUG,
            period.ms = period.as_millis(),
            "ticker started"
        );

        Ok(Self {
            receiver,
            stop,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Returns the channel the ticks are sent to.
    #[must_use]
    pub fn receiver(&self) -> &Receiver<SystemTime> {
        &self.receiver
    }

    /// Stops the ticker.
    ///
    /// No tick is sent after this method returns, though a tick sent just before may still
    /// sit in the channel. Calling `stop` more than once has no further effect.
    pub fn stop(&self) {
        // A full channel means a stop request is already pending.
        _ = self.stop.try_send(());

        // Held while joining so a concurrent caller returns only once the worker is gone.
        let mut worker = self.worker.lock();

        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                tracing::event!(name: "tock.ticker.panicked", tracing::Level::ERROR, "ticker thread panicked");
            }

            tracing::event!(name: "tock.ticker.stopped", tracing::Level::DEBUG, "ticker stopped");
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg_attr(test, mutants::skip)] // Causes test timeout.
fn run(timer: &Timer, fired: &Receiver<SystemTime>, ticks: &Sender<SystemTime>, stop: &Receiver<()>, period: Duration) {
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(fired) -> tick => {
                let Ok(tick) = tick else {
                    break;
                };

                if let Err(TrySendError::Full(_)) = ticks.try_send(tick) {
                    tracing::event!(
                        name: "tock.ticker.dropped",
                        tracing::Level::TRACE,
                        "tick dropped, the previous one was not consumed yet"
                    );
                }

                timer.reset(period);
            }
        }
    }

    // Leaves the waiting set so blocked threads see the ticker is gone.
    timer.stop();
}
