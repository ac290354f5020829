// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, io};

/// The result type for fallible operations that use the [`Error`] type of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur when creating time primitives.
///
/// Almost nothing in this crate fails. Registering a wakeup with a zero or past deadline
/// fires it immediately, and moving a virtual clock never fails inside the supported time
/// range. The error is returned by [`Ticker::try_new`][crate::Ticker::try_new] when:
///
/// * The ticker period is zero.
/// * The background thread of the ticker cannot be spawned.
///
/// # Limited introspection
///
/// Other than implementing the [`std::error::Error`] and [`core::fmt::Debug`] traits, this error type
/// currently provides no introspection capabilities.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tock::{Clock, Ticker};
///
/// let clock = Clock::new_frozen();
/// let error = Ticker::try_new(&clock, Duration::ZERO).unwrap_err();
///
/// assert_eq!(error.to_string(), "non-positive interval for ticker");
/// ```
#[derive(Debug)]
pub struct Error(ErrorKind);

#[derive(Debug)]
enum ErrorKind {
    NonPositivePeriod,
    Spawn(io::Error),
}

impl Error {
    const fn from_kind(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub(crate) const fn non_positive_period() -> Self {
        Self::from_kind(ErrorKind::NonPositivePeriod)
    }

    pub(crate) const fn spawn(error: io::Error) -> Self {
        Self::from_kind(ErrorKind::Spawn(error))
    }

    #[cfg(test)]
    const fn kind(&self) -> &ErrorKind {
        &self.0
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            ErrorKind::NonPositivePeriod => write!(f, "non-positive interval for ticker"),
            ErrorKind::Spawn(_) => write!(f, "failed to spawn the ticker thread"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.0 {
            ErrorKind::NonPositivePeriod => None,
            ErrorKind::Spawn(err) => Some(err),
        }
    }
}
