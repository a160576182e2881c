//! Pin-control contract consumed by the button state machine.
//!
//! [`PinControl`] is the seam to the kernel's GPIO interface. Every operation is
//! blocking, fallible and safe to repeat; the state machine decides how often
//! to retry (see [`RetryPolicy`](crate::retry::RetryPolicy)).

use core::fmt;

/// Kernel GPIO line number.
pub type PinNumber = u64;

/// Logic level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// Logic 0. An input reading `Low` means the button is pressed.
    Low = 0,
    /// Logic 1. An input reading `High` means the button is released.
    High = 1,
}

impl Level {
    /// Interprets a raw value read from the line.
    ///
    /// Zero is `Low`; anything else counts as `High`.
    #[inline]
    pub fn from_raw(raw: u8) -> Self {
        if raw == 0 { Level::Low } else { Level::High }
    }

    /// Returns the raw value to write for this level.
    #[inline]
    pub fn as_raw(self) -> u8 {
        self as u8
    }
}

/// Direction of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Line is sampled.
    In,
    /// Line is driven.
    Out,
}

/// Trait for abstracting kernel pin control.
///
/// Implement this for your platform's GPIO interface (sysfs, character device,
/// a simulator). None of the methods keep state between calls that the caller
/// relies on, so each one may be retried after a failure.
pub trait PinControl {
    /// Error reported by a failed operation.
    type Error: fmt::Debug;

    /// Requests kernel control of `pin`.
    fn export(&mut self, pin: PinNumber) -> Result<(), Self::Error>;

    /// Returns control of `pin` to the kernel.
    fn unexport(&mut self, pin: PinNumber) -> Result<(), Self::Error>;

    /// Configures `pin` as an input or an output.
    fn set_direction(&mut self, pin: PinNumber, direction: Direction) -> Result<(), Self::Error>;

    /// Samples the level of `pin`.
    fn read_level(&mut self, pin: PinNumber) -> Result<Level, Self::Error>;

    /// Drives `pin` to `level`.
    fn write_level(&mut self, pin: PinNumber, level: Level) -> Result<(), Self::Error>;
}

impl<P: PinControl + ?Sized> PinControl for &mut P {
    type Error = P::Error;

    fn export(&mut self, pin: PinNumber) -> Result<(), Self::Error> {
        (**self).export(pin)
    }

    fn unexport(&mut self, pin: PinNumber) -> Result<(), Self::Error> {
        (**self).unexport(pin)
    }

    fn set_direction(&mut self, pin: PinNumber, direction: Direction) -> Result<(), Self::Error> {
        (**self).set_direction(pin, direction)
    }

    fn read_level(&mut self, pin: PinNumber) -> Result<Level, Self::Error> {
        (**self).read_level(pin)
    }

    fn write_level(&mut self, pin: PinNumber, level: Level) -> Result<(), Self::Error> {
        (**self).write_level(pin, level)
    }
}

/// Pin-control operation, used to tag failures and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinOp {
    Export,
    Unexport,
    SetDirection,
    Write,
}

impl fmt::Display for PinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinOp::Export => "export",
            PinOp::Unexport => "unexport",
            PinOp::SetDirection => "set direction of",
            PinOp::Write => "write",
        };
        f.write_str(name)
    }
}

/// A pin-control operation that kept failing until the retry policy gave up.
#[derive(Debug)]
pub struct PinError<E> {
    /// Operation that failed.
    pub op: PinOp,
    /// Line the operation targeted.
    pub pin: PinNumber,
    /// Number of attempts made, including the last one.
    pub attempts: u32,
    /// Error returned by the last attempt.
    pub source: E,
}

impl<E: fmt::Display> fmt::Display for PinError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to {} gpio{} after {} attempt(s): {}",
            self.op, self.pin, self.attempts, self.source
        )
    }
}

#[cfg(feature = "std")]
impl<E: std::error::Error + 'static> std::error::Error for PinError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
