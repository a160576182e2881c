//! Button events and the handlers that receive them.

use core::fmt;

/// Semantic event produced by the button state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonEvent {
    /// The input went low: a press episode began.
    PressDown,
    /// The input returned high after a press episode.
    PressUp,
    /// The press has been held for the long-click threshold.
    LongClick,
}

impl fmt::Display for ButtonEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ButtonEvent::PressDown => "press-down",
            ButtonEvent::PressUp => "press-up",
            ButtonEvent::LongClick => "long-click",
        };
        f.write_str(name)
    }
}

/// Trait for receiving button events.
///
/// The three methods are called from the button's polling task, in order:
/// `on_press_down`, at most one `on_long_click`, then `on_press_up` for every
/// press episode. They run on the polling thread, so long-running work delays
/// the next level read.
pub trait ButtonEvents {
    /// Called once when a press is detected.
    fn on_press_down(&mut self);

    /// Called once when the button is released after a press.
    fn on_press_up(&mut self);

    /// Called at most once per press, when it has been held long enough.
    fn on_long_click(&mut self);

    /// Dispatches `event` to the matching method.
    #[inline]
    fn on_event(&mut self, event: ButtonEvent) {
        match event {
            ButtonEvent::PressDown => self.on_press_down(),
            ButtonEvent::PressUp => self.on_press_up(),
            ButtonEvent::LongClick => self.on_long_click(),
        }
    }
}

impl<H: ButtonEvents + ?Sized> ButtonEvents for &mut H {
    fn on_press_down(&mut self) {
        (**self).on_press_down()
    }

    fn on_press_up(&mut self) {
        (**self).on_press_up()
    }

    fn on_long_click(&mut self) {
        (**self).on_long_click()
    }
}

#[cfg(feature = "std")]
type Action = Box<dyn FnMut() + Send>;

/// Three independently supplied closures, one per event.
///
/// Usually built through [`ButtonDescriptor::builder`](crate::ButtonDescriptor::builder).
#[cfg(feature = "std")]
pub struct Callbacks {
    press_down: Action,
    press_up: Action,
    long_click: Action,
}

#[cfg(feature = "std")]
impl Callbacks {
    /// Bundles the three closures.
    pub fn new(
        on_press_down: impl FnMut() + Send + 'static,
        on_press_up: impl FnMut() + Send + 'static,
        on_long_click: impl FnMut() + Send + 'static,
    ) -> Self {
        Self::from_boxed(
            Box::new(on_press_down),
            Box::new(on_press_up),
            Box::new(on_long_click),
        )
    }

    pub(crate) fn from_boxed(press_down: Action, press_up: Action, long_click: Action) -> Self {
        Self {
            press_down,
            press_up,
            long_click,
        }
    }
}

#[cfg(feature = "std")]
impl ButtonEvents for Callbacks {
    fn on_press_down(&mut self) {
        (self.press_down)()
    }

    fn on_press_up(&mut self) {
        (self.press_up)()
    }

    fn on_long_click(&mut self) {
        (self.long_click)()
    }
}

#[cfg(feature = "std")]
impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

/// Forwards events into a channel. A disconnected receiver drops them.
#[cfg(feature = "std")]
impl ButtonEvents for std::sync::mpsc::Sender<ButtonEvent> {
    fn on_press_down(&mut self) {
        let _ = self.send(ButtonEvent::PressDown);
    }

    fn on_press_up(&mut self) {
        let _ = self.send(ButtonEvent::PressUp);
    }

    fn on_long_click(&mut self) {
        let _ = self.send(ButtonEvent::LongClick);
    }
}
