#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`ButtonDescriptor`**: Input pin, output pin, polling rate and the event handler for one button
//! - **`ButtonEvents`**: Trait receiving `on_press_down`, `on_press_up` and `on_long_click`
//! - **`Callbacks`**: Three closures implementing `ButtonEvents`
//! - **`ButtonMachine`**: The polling state machine (`Idle`, `Pressed`, `PressedLongFired`, `Released`)
//! - **`PinControl`**: Trait to implement for your GPIO interface
//! - **`TimeSource`**: Trait to implement for your timing system
//! - **`RetryPolicy`**: How failing pin operations are repeated
//! - **`start` / `ButtonTask`**: One polling thread per button, stopped through its handle
//! - **`SysfsPins`**: `PinControl` over `/sys/class/gpio`
//!
//! The input pin reads low while the button is pressed. A press held for
//! [`LONG_CLICK_THRESHOLD_MS`] reports a long-click once, before the release.

pub mod descriptor;
pub mod events;
pub mod machine;
pub mod pin;
pub mod retry;
#[cfg(feature = "sysfs")]
pub mod sysfs;
#[cfg(feature = "std")]
pub mod task;
pub mod time;

pub use descriptor::{ButtonDescriptor, DescriptorError};
pub use events::{ButtonEvent, ButtonEvents};
pub use machine::{ButtonMachine, ButtonState, Cancellation, PollOutcome};
pub use pin::{Direction, Level, PinControl, PinError, PinNumber, PinOp};
pub use retry::RetryPolicy;
pub use time::{TimeDuration, TimeInstant, TimeSource};

#[cfg(feature = "std")]
pub use descriptor::DescriptorBuilder;
#[cfg(feature = "std")]
pub use events::Callbacks;
#[cfg(feature = "sysfs")]
pub use sysfs::SysfsPins;
#[cfg(feature = "std")]
pub use task::{ButtonTask, SpawnError, TaskBuilder, TaskError, start};
#[cfg(feature = "std")]
pub use time::SystemClock;

/// How long a press must be held before it counts as a long-click.
pub const LONG_CLICK_THRESHOLD_MS: u64 = 800;
