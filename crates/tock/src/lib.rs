// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(
    test,
    allow(
        clippy::arithmetic_side_effects,
        clippy::unchecked_time_subtraction,
        reason = "allow these lints in tests to improve the readability of the tests"
    )
)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A manually advanced clock for deterministic testing of threaded, time-dependent code.
//!
//! # Quick Start
//!
//! ```
//! use std::thread;
//! use std::time::Duration;
//!
//! use tock::{Clock, ClockControl};
//!
//! fn produce_value(clock: &Clock) -> u64 {
//!     let start = clock.now();
//!     clock.sleep(Duration::from_secs(60));
//!     println!("elapsed time: {}s", clock.since(start).as_secs());
//!     123
//! }
//!
//! // In production
//! # fn production() {
//! let clock = Clock::new_system();
//! assert_eq!(produce_value(&clock), 123);
//! # }
//!
//! // In tests, the minute passes without waiting for it
//! let control = ClockControl::new();
//! let clock = control.to_clock();
//! let producer = thread::spawn(move || produce_value(&clock));
//!
//! control.block_until(1);
//! control.advance(Duration::from_secs(60));
//!
//! assert_eq!(producer.join().unwrap(), 123);
//! ```
//!
//! # Why?
//!
//! Code that sleeps, waits for deadlines or does periodic work is slow and flaky to test
//! against real time. This crate provides a unified API for working with time that:
//!
//! - **Enables deterministic testing** - [`ClockControl`] moves the time of a virtual clock
//!   forward or backward on demand, and every wakeup that became due fires before the call
//!   returns. No waiting for a 1-minute periodic job in your tests.
//! - **Synchronizes with the code under test** - [`ClockControl::block_until`] waits until the
//!   code under test has gone to sleep, so the test advances time at the right moment instead
//!   of guessing with real sleeps.
//! - **Stays out of the way in production** - code using [`Clock`] works identically with the
//!   wall clock via [`Clock::new_system`].
//!
//! # Overview
//!
//! - [`Clock`] - Provides an abstraction for time-related operations. Returns the current time
//!   as `SystemTime` and creates the other time primitives.
//! - [`ClockControl`] - Controls the passage of time of a virtual clock.
//! - [`Timer`] - A single-shot wakeup that can be stopped and reset.
//! - [`Ticker`] - A wakeup that repeats every period.
//! - [`Error`] - Represents an error that can occur when creating time primitives. Provides
//!   limited introspection capabilities.
//!
//! # Wakeups and channels
//!
//! Wakeups are delivered over [`crossbeam_channel`] channels that hold at most one value. A
//! wakeup that finds the channel still full is dropped rather than queued, so a consumer that
//! falls behind a [`Ticker`] sees fewer ticks, never a backlog. Channels compose with
//! [`crossbeam_channel::select!`] to wait for work and a deadline at once.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events named with the `tock.` prefix. Registration and delivery
//! of wakeups are logged at trace level, clock movements and ticker lifecycle at debug level, and
//! failures to spawn a thread at error level.

mod blocker;
mod clock;
mod clock_control;
mod driver;
mod error;
mod registry;
mod sleeper;
mod state;
#[cfg(test)]
mod testing;
mod ticker;
mod timer;

pub use clock::Clock;
pub use clock_control::ClockControl;
pub use error::{Error, Result};
pub use ticker::Ticker;
pub use timer::Timer;
