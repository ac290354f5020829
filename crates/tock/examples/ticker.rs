// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![expect(clippy::unwrap_used, reason = "example code")]

//! This example runs a periodic job against the wall clock and stops it after a few ticks.

use std::time::Duration;

use crossbeam_channel::select;
use tock::Clock;

fn main() {
    let clock = Clock::new_system();
    let ticker = clock.ticker(Duration::from_millis(10));
    let deadline = clock.after(Duration::from_millis(55));

    let start = clock.now();

    loop {
        select! {
            recv(ticker.receiver()) -> tick => {
                let elapsed = tick.unwrap().duration_since(start).unwrap_or_default();
                println!("tick after {}ms", elapsed.as_millis());
            }
            recv(deadline) -> _ => break,
        }
    }

    ticker.stop();
    println!("done after {}ms", clock.since(start).as_millis());
}
