// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![expect(clippy::unwrap_used, reason = "example code")]

//! This example demonstrates how to use `ClockControl` to control the passage of time.

use std::thread;
use std::time::Duration;

use tock::ClockControl;

fn main() {
    let control = ClockControl::new();
    let clock = control.to_clock();

    // Retrieve the current time.
    let now = clock.now();

    // Retrieve the time again later.
    let later = clock.now();

    // Notice that the time is the same.
    assert_eq!(now, later);

    // Advance the clock by 1 second.
    control.advance(Duration::from_secs(1));

    // Verify that time has advanced by 1 second.
    assert_eq!(clock.since(later), Duration::from_secs(1));

    // Sleep for 1000 seconds on another thread.
    let sleeper = {
        let clock = clock.clone();
        thread::spawn(move || clock.sleep(Duration::from_secs(1000)))
    };

    // Wait until the thread is asleep, then let the 1000 seconds pass at once.
    control.block_until(1);
    control.advance(Duration::from_secs(1000));

    sleeper.join().unwrap();
    println!("slept for {}s", clock.since(later).as_secs());
}
