//! Retry policy for pin-control operations.

use crate::pin::{PinError, PinNumber, PinOp};
use crate::time::TimeDuration;
use core::fmt;

/// How persistently a failing pin-control operation is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy<D> {
    /// Repeat immediately until the operation succeeds.
    ///
    /// A pin that never becomes available blocks the button task forever
    /// (only a stop request can interrupt setup).
    Forever,

    /// Give up after `attempts` tries, sleeping `backoff` between them.
    Bounded {
        /// Total number of tries. Zero behaves like one.
        attempts: u32,
        /// Pause between tries.
        backoff: D,
    },
}

impl<D> Default for RetryPolicy<D> {
    fn default() -> Self {
        RetryPolicy::Forever
    }
}

impl<D: TimeDuration> RetryPolicy<D> {
    /// Bounded policy with the given number of tries and backoff in milliseconds.
    pub fn bounded(attempts: u32, backoff_millis: u64) -> Self {
        RetryPolicy::Bounded {
            attempts,
            backoff: D::from_millis(backoff_millis),
        }
    }
}

/// Runs `attempt` until it succeeds or `policy` gives up.
///
/// `cancelled` is consulted after every failed attempt; a cancellation turns
/// into `Ok(None)`. `announce` controls whether the first failure and a late
/// success are logged.
pub(crate) fn with_retry<R, E, D>(
    policy: &RetryPolicy<D>,
    op: PinOp,
    pin: PinNumber,
    announce: bool,
    mut pause: impl FnMut(D),
    cancelled: impl Fn() -> bool,
    mut attempt: impl FnMut() -> Result<R, E>,
) -> Result<Option<R>, PinError<E>>
where
    E: fmt::Debug,
    D: TimeDuration,
{
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let source = match attempt() {
            Ok(value) => {
                if announce && attempts > 1 {
                    log::debug!("{} gpio{} succeeded after {} attempts", op, pin, attempts);
                }
                return Ok(Some(value));
            }
            Err(source) => source,
        };

        match policy {
            RetryPolicy::Forever => {
                if announce && attempts == 1 {
                    log::warn!("{} gpio{} failed ({:?}), retrying until it succeeds", op, pin, source);
                }
            }
            RetryPolicy::Bounded { attempts: limit, backoff } => {
                if attempts >= *limit {
                    return Err(PinError {
                        op,
                        pin,
                        attempts,
                        source,
                    });
                }
                if announce && attempts == 1 {
                    log::warn!("{} gpio{} failed ({:?}), retrying up to {} times", op, pin, source, limit);
                }
                pause(*backoff);
            }
        }

        if cancelled() {
            return Ok(None);
        }
    }
}
