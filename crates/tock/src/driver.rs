// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Weak;
use std::thread;
use std::time::Duration;

use crate::state::ClockState;

/// How often the system clock driver fires due sleepers.
///
/// Wakeups of a system clock are late by at most this much plus scheduling delays.
pub(crate) const DRIVER_RESOLUTION: Duration = Duration::from_millis(1);

/// Starts the thread that fires due sleepers of a system clock.
///
/// The thread holds only a weak reference and exits once every clock sharing the state is gone.
pub(crate) fn spawn(state: Weak<ClockState>) {
    let spawned = thread::Builder::new()
        .name("tock-driver".to_string())
        .spawn(move || drive(&state));

    if let Err(error) = spawned {
        // Timers of this clock now fire only when stopped or reset.
        tracing::event!(
            name: "tock.driver.spawn_failed",
            tracing::Level::ERROR,
            error = %error,
            "failed to spawn the system clock driver"
        );
    }
}

#[cfg_attr(test, mutants::skip)] // Causes test timeout.
fn drive(state: &Weak<ClockState>) {
    tracing::event!(name: "tock.driver.started", tracing::Level::DEBUG, "system clock driver started");

    loop {
        thread::sleep(DRIVER_RESOLUTION);

        let Some(state) = state.upgrade() else {
            break;
        };

        state.advance(Duration::ZERO);
    }

    tracing::event!(
        name: "tock.driver.stopped",
        tracing::Level::DEBUG,
        "system clock driver stopped, all clocks have been dropped"
    );
}
