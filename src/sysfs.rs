//! Linux sysfs GPIO adapter.
//!
//! Talks to `/sys/class/gpio` through the [`sysfs_gpio`] crate. Every call
//! opens, writes or reads, and closes the relevant attribute file, so the
//! adapter keeps no state and any call can be repeated.

use crate::pin::{Direction, Level, PinControl, PinNumber};
use sysfs_gpio::Pin;

/// [`PinControl`] backed by the kernel's sysfs GPIO interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsPins;

impl SysfsPins {
    /// Creates the adapter.
    pub fn new() -> Self {
        Self
    }
}

impl PinControl for SysfsPins {
    type Error = sysfs_gpio::Error;

    fn export(&mut self, pin: PinNumber) -> Result<(), Self::Error> {
        Pin::new(pin).export()
    }

    fn unexport(&mut self, pin: PinNumber) -> Result<(), Self::Error> {
        Pin::new(pin).unexport()
    }

    fn set_direction(&mut self, pin: PinNumber, direction: Direction) -> Result<(), Self::Error> {
        let direction = match direction {
            Direction::In => sysfs_gpio::Direction::In,
            Direction::Out => sysfs_gpio::Direction::Out,
        };
        Pin::new(pin).set_direction(direction)
    }

    fn read_level(&mut self, pin: PinNumber) -> Result<Level, Self::Error> {
        Pin::new(pin).get_value().map(Level::from_raw)
    }

    fn write_level(&mut self, pin: PinNumber, level: Level) -> Result<(), Self::Error> {
        Pin::new(pin).set_value(level.as_raw())
    }
}
