//! Button configuration.

use crate::events::{ButtonEvent, ButtonEvents};
use crate::pin::PinNumber;
use crate::time::TimeDuration;
use core::fmt;

#[cfg(feature = "std")]
use crate::events::Callbacks;

/// Descriptor validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorError {
    /// Input and output pins are the same line.
    SamePin(PinNumber),

    /// Polling rate of zero.
    ZeroPollingRate,

    /// A callback was not supplied.
    MissingCallback(ButtonEvent),
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorError::SamePin(pin) => {
                write!(f, "input and output must be different pins (both are gpio{})", pin)
            }
            DescriptorError::ZeroPollingRate => {
                write!(f, "polling rate must be at least 1 Hz")
            }
            DescriptorError::MissingCallback(event) => {
                write!(f, "no {} callback supplied", event)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DescriptorError {}

/// Immutable description of one physical button.
///
/// The input pin is sampled (low means pressed); the output pin is driven high
/// on every poll as the button's bias signal. Once handed to
/// [`start`](crate::start) or [`ButtonMachine::new`](crate::ButtonMachine::new)
/// the descriptor is owned by the polling task, so nothing the caller does
/// afterwards can change it.
///
/// # Type Parameters
/// * `H` - Event handler receiving press-down, press-up and long-click
#[derive(Debug)]
pub struct ButtonDescriptor<H> {
    input_pin: PinNumber,
    output_pin: PinNumber,
    polling_rate: u32,
    handler: H,
}

impl<H: ButtonEvents> ButtonDescriptor<H> {
    /// Creates a validated descriptor.
    ///
    /// # Errors
    /// * `SamePin` - `input_pin == output_pin`
    /// * `ZeroPollingRate` - `polling_rate == 0`
    pub fn new(
        input_pin: PinNumber,
        output_pin: PinNumber,
        polling_rate: u32,
        handler: H,
    ) -> Result<Self, DescriptorError> {
        if input_pin == output_pin {
            return Err(DescriptorError::SamePin(input_pin));
        }
        if polling_rate == 0 {
            return Err(DescriptorError::ZeroPollingRate);
        }

        Ok(Self {
            input_pin,
            output_pin,
            polling_rate,
            handler,
        })
    }

    /// Returns the sampled pin.
    pub fn input_pin(&self) -> PinNumber {
        self.input_pin
    }

    /// Returns the driven pin.
    pub fn output_pin(&self) -> PinNumber {
        self.output_pin
    }

    /// Returns the polling rate in polls per second.
    pub fn polling_rate(&self) -> u32 {
        self.polling_rate
    }

    /// Returns the pause between two polls, `1 / polling_rate` seconds.
    ///
    /// Computed in microseconds, so rates above one million polls per second
    /// round down to no pause.
    pub fn polling_interval<D: TimeDuration>(&self) -> D {
        D::from_micros(1_000_000 / u64::from(self.polling_rate))
    }

    pub(crate) fn into_parts(self) -> (PinNumber, PinNumber, H) {
        (self.input_pin, self.output_pin, self.handler)
    }
}

#[cfg(feature = "std")]
impl ButtonDescriptor<Callbacks> {
    /// Starts building a descriptor from closures.
    ///
    /// # Example
    ///
    /// ```
    /// use gpio_button::ButtonDescriptor;
    ///
    /// let button = ButtonDescriptor::builder(20, 21)
    ///     .polling_rate(100)
    ///     .on_press_down(|| println!("down"))
    ///     .on_press_up(|| println!("up"))
    ///     .on_long_click(|| println!("long"))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(button.input_pin(), 20);
    /// ```
    pub fn builder(input_pin: PinNumber, output_pin: PinNumber) -> DescriptorBuilder {
        DescriptorBuilder::new(input_pin, output_pin)
    }
}

/// Builder for descriptors whose handler is three closures.
#[cfg(feature = "std")]
pub struct DescriptorBuilder {
    input_pin: PinNumber,
    output_pin: PinNumber,
    polling_rate: u32,
    press_down: Option<Box<dyn FnMut() + Send>>,
    press_up: Option<Box<dyn FnMut() + Send>>,
    long_click: Option<Box<dyn FnMut() + Send>>,
}

#[cfg(feature = "std")]
impl DescriptorBuilder {
    /// Creates a builder with no polling rate and no callbacks.
    pub fn new(input_pin: PinNumber, output_pin: PinNumber) -> Self {
        Self {
            input_pin,
            output_pin,
            polling_rate: 0,
            press_down: None,
            press_up: None,
            long_click: None,
        }
    }

    /// Sets the polling rate in polls per second.
    pub fn polling_rate(mut self, hz: u32) -> Self {
        self.polling_rate = hz;
        self
    }

    /// Sets the press-down callback.
    pub fn on_press_down(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.press_down = Some(Box::new(f));
        self
    }

    /// Sets the press-up callback.
    pub fn on_press_up(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.press_up = Some(Box::new(f));
        self
    }

    /// Sets the long-click callback.
    pub fn on_long_click(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.long_click = Some(Box::new(f));
        self
    }

    /// Validates and builds the descriptor.
    ///
    /// # Errors
    /// * `MissingCallback` - One of the three callbacks was never set
    /// * `SamePin`, `ZeroPollingRate` - As for [`ButtonDescriptor::new`]
    pub fn build(self) -> Result<ButtonDescriptor<Callbacks>, DescriptorError> {
        let press_down = self
            .press_down
            .ok_or(DescriptorError::MissingCallback(ButtonEvent::PressDown))?;
        let press_up = self
            .press_up
            .ok_or(DescriptorError::MissingCallback(ButtonEvent::PressUp))?;
        let long_click = self
            .long_click
            .ok_or(DescriptorError::MissingCallback(ButtonEvent::LongClick))?;

        ButtonDescriptor::new(
            self.input_pin,
            self.output_pin,
            self.polling_rate,
            Callbacks::from_boxed(press_down, press_up, long_click),
        )
    }
}

#[cfg(feature = "std")]
impl fmt::Debug for DescriptorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorBuilder")
            .field("input_pin", &self.input_pin)
            .field("output_pin", &self.output_pin)
            .field("polling_rate", &self.polling_rate)
            .field("press_down", &self.press_down.is_some())
            .field("press_up", &self.press_up.is_some())
            .field("long_click", &self.long_click.is_some())
            .finish()
    }
}
