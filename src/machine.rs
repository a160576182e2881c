//! Button event state machine.
//!
//! Provides [`ButtonMachine`], which claims the button's two pins, polls the
//! input level and turns it into press-down, long-click and press-up events.
//! The machine releases its pins exactly once, when it finishes or is dropped.
//!
//! # States
//!
//! ```text
//!            level == 0 / on_press_down
//!   Idle ─────────────────────────────────► Pressed
//!    ▲                                         │ held >= 800 ms / on_long_click
//!    │ level != 1                              ▼
//! Released ◄──────────────────────────── PressedLongFired
//!            level != 0 / on_press_up    (also from Pressed)
//! ```

use crate::LONG_CLICK_THRESHOLD_MS;
use crate::descriptor::ButtonDescriptor;
use crate::events::{ButtonEvent, ButtonEvents};
use crate::pin::{Direction, Level, PinControl, PinError, PinNumber, PinOp};
use crate::retry::{RetryPolicy, with_retry};
use crate::time::{TimeDuration, TimeInstant, TimeSource};
use core::sync::atomic::{AtomicBool, Ordering};

/// Current state of a button state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonState {
    /// No press in progress.
    Idle,
    /// Button held, long-click not yet reported.
    Pressed,
    /// Button held, long-click already reported for this press.
    PressedLongFired,
    /// Press-up reported; waiting for the level to leave high.
    Released,
}

/// Result of one poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollOutcome {
    /// Iteration finished; pace and poll again.
    Continue,
    /// A stop request was observed.
    Cancelled,
}

/// Source of stop requests for a running machine.
pub trait Cancellation {
    /// Returns true once the machine should stop.
    fn is_cancelled(&self) -> bool;
}

impl Cancellation for AtomicBool {
    #[inline]
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<C: Cancellation + ?Sized> Cancellation for &C {
    #[inline]
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

#[cfg(feature = "std")]
impl<C: Cancellation + ?Sized> Cancellation for std::sync::Arc<C> {
    #[inline]
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

// Exists only between press-down and the matching release.
#[derive(Debug, Clone, Copy)]
struct PressEpisode<I> {
    started_at: I,
    long_click_fired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PinClaim {
    Unclaimed,
    Claimed,
    Released,
}

/// Polls one button and reports its events.
///
/// # Type Parameters
/// * `P` - Pin-control implementation
/// * `T` - Time source implementation
/// * `I` - Time instant type
/// * `H` - Event handler
pub struct ButtonMachine<P, T, I, H>
where
    P: PinControl,
    T: TimeSource<I>,
    I: TimeInstant,
    H: ButtonEvents,
{
    pins: P,
    clock: T,
    handler: H,
    input_pin: PinNumber,
    output_pin: PinNumber,
    interval: I::Duration,
    retry: RetryPolicy<I::Duration>,
    state: ButtonState,
    episode: Option<PressEpisode<I>>,
    pending_press: Option<I>,
    claim: PinClaim,
}

impl<P, T, I, H> ButtonMachine<P, T, I, H>
where
    P: PinControl,
    T: TimeSource<I>,
    I: TimeInstant,
    H: ButtonEvents,
{
    /// Creates an idle machine for `descriptor`. No pin is touched yet.
    pub fn new(descriptor: ButtonDescriptor<H>, pins: P, clock: T) -> Self {
        let interval = descriptor.polling_interval();
        let (input_pin, output_pin, handler) = descriptor.into_parts();

        Self {
            pins,
            clock,
            handler,
            input_pin,
            output_pin,
            interval,
            retry: RetryPolicy::Forever,
            state: ButtonState::Idle,
            episode: None,
            pending_press: None,
            claim: PinClaim::Unclaimed,
        }
    }

    /// Replaces the retry policy used for every pin operation.
    pub fn with_retry(mut self, retry: RetryPolicy<I::Duration>) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// Returns the pause between two polls.
    pub fn interval(&self) -> I::Duration {
        self.interval
    }

    /// Runs setup, then polls until `cancel` fires, then releases the pins.
    ///
    /// Returns `Ok(())` after a stop request. An error means the retry policy
    /// gave up on a pin operation; the pins have been released in that case too.
    pub fn run<C: Cancellation + ?Sized>(mut self, cancel: &C) -> Result<(), PinError<P::Error>> {
        let outcome = self.drive(cancel);
        let released = self.release();
        outcome.and(released)
    }

    fn drive<C: Cancellation + ?Sized>(&mut self, cancel: &C) -> Result<(), PinError<P::Error>> {
        if self.setup(cancel)? == PollOutcome::Cancelled {
            return Ok(());
        }

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if self.poll_once(cancel)? == PollOutcome::Cancelled {
                return Ok(());
            }
            self.clock.sleep(self.interval);
        }
    }

    /// Claims both pins and configures their directions.
    ///
    /// Order: export output, export input, output to `Out`, input to `In`.
    /// From the first call on, the machine owns both pins and will release them.
    pub fn setup<C: Cancellation + ?Sized>(
        &mut self,
        cancel: &C,
    ) -> Result<PollOutcome, PinError<P::Error>> {
        if self.claim == PinClaim::Unclaimed {
            self.claim = PinClaim::Claimed;
        }

        let (input, output) = (self.input_pin, self.output_pin);
        let steps = [
            (PinOp::Export, output, None),
            (PinOp::Export, input, None),
            (PinOp::SetDirection, output, Some(Direction::Out)),
            (PinOp::SetDirection, input, Some(Direction::In)),
        ];

        for (op, pin, direction) in steps {
            let done = self.retry_op(op, pin, true, || cancel.is_cancelled(), |pins| match direction {
                Some(direction) => pins.set_direction(pin, direction),
                None => pins.export(pin),
            })?;
            if done.is_none() {
                log::info!("gpio{}/gpio{}: stop requested during setup", input, output);
                return Ok(PollOutcome::Cancelled);
            }
        }

        log::info!("gpio{}: polling button, bias on gpio{}", input, output);
        Ok(PollOutcome::Continue)
    }

    /// Runs one poll iteration.
    ///
    /// Drives the output high, then samples the input. A press is followed
    /// without pause until release, and the release until the level leaves
    /// high, so one call may cover a whole press.
    pub fn poll_once<C: Cancellation + ?Sized>(
        &mut self,
        cancel: &C,
    ) -> Result<PollOutcome, PinError<P::Error>> {
        let output = self.output_pin;
        let written = self.retry_op(
            PinOp::Write,
            output,
            false,
            || cancel.is_cancelled(),
            |pins| pins.write_level(output, Level::High),
        )?;
        if written.is_none() {
            return Ok(PollOutcome::Cancelled);
        }

        let pressed_at = match self.pending_press.take() {
            Some(at) => at,
            None => match self.sample() {
                (Level::Low, at) => at,
                (Level::High, _) => return Ok(PollOutcome::Continue),
            },
        };

        if self.follow_press(pressed_at, cancel) == PollOutcome::Cancelled {
            return Ok(PollOutcome::Cancelled);
        }
        Ok(self.wait_for_next_press(cancel))
    }

    /// Releases both pins: output first, then input.
    ///
    /// Does nothing unless setup has started, and nothing the second time.
    /// Never interrupted by a stop request.
    pub fn release(&mut self) -> Result<(), PinError<P::Error>> {
        if self.claim != PinClaim::Claimed {
            return Ok(());
        }
        self.claim = PinClaim::Released;

        let (input, output) = (self.input_pin, self.output_pin);
        let output_result = self.retry_op(PinOp::Unexport, output, true, || false, |pins| pins.unexport(output));
        let input_result = self.retry_op(PinOp::Unexport, input, true, || false, |pins| pins.unexport(input));

        log::info!("gpio{}: released output gpio{} and input gpio{}", input, output, input);
        output_result.and(input_result).map(|_| ())
    }

    // Press-down through release. Returns Cancelled if stopped while held.
    fn follow_press<C: Cancellation + ?Sized>(&mut self, started_at: I, cancel: &C) -> PollOutcome {
        self.episode = Some(PressEpisode {
            started_at,
            long_click_fired: false,
        });
        self.state = ButtonState::Pressed;
        self.fire(ButtonEvent::PressDown);

        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            let (level, now) = self.sample();
            if level != Level::Low {
                break;
            }

            let Some(episode) = self.episode.as_mut() else {
                break;
            };
            let held = now.duration_since(episode.started_at).as_millis();
            if held >= LONG_CLICK_THRESHOLD_MS && !episode.long_click_fired {
                episode.long_click_fired = true;
                self.state = ButtonState::PressedLongFired;
                self.fire(ButtonEvent::LongClick);
            }
        }

        self.episode = None;
        self.state = ButtonState::Released;
        self.fire(ButtonEvent::PressUp);
        PollOutcome::Continue
    }

    // Spins until the input leaves high. A low level seen here is the next
    // press edge and is replayed by the next poll.
    fn wait_for_next_press<C: Cancellation + ?Sized>(&mut self, cancel: &C) -> PollOutcome {
        loop {
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled;
            }

            if let (Level::Low, at) = self.sample() {
                self.pending_press = Some(at);
                self.state = ButtonState::Idle;
                return PollOutcome::Continue;
            }
        }
    }

    // Reads the input and timestamps the reading. A failed read counts as released.
    fn sample(&mut self) -> (Level, I) {
        let level = self.pins.read_level(self.input_pin).unwrap_or(Level::High);
        (level, self.clock.now())
    }

    fn fire(&mut self, event: ButtonEvent) {
        self.handler.on_event(event);
    }

    fn retry_op<R>(
        &mut self,
        op: PinOp,
        pin: PinNumber,
        announce: bool,
        cancelled: impl Fn() -> bool,
        mut attempt: impl FnMut(&mut P) -> Result<R, P::Error>,
    ) -> Result<Option<R>, PinError<P::Error>> {
        let clock = &self.clock;
        let pins = &mut self.pins;
        with_retry(
            &self.retry,
            op,
            pin,
            announce,
            |backoff| clock.sleep(backoff),
            cancelled,
            || attempt(&mut *pins),
        )
    }
}

impl<P, T, I, H> Drop for ButtonMachine<P, T, I, H>
where
    P: PinControl,
    T: TimeSource<I>,
    I: TimeInstant,
    H: ButtonEvents,
{
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            log::error!(
                "gpio{}: could not release pins ({} gpio{} failed {} times): {:?}",
                self.input_pin,
                err.op,
                err.pin,
                err.attempts,
                err.source
            );
        }
    }
}

impl<P, T, I, H> core::fmt::Debug for ButtonMachine<P, T, I, H>
where
    P: PinControl,
    T: TimeSource<I>,
    I: TimeInstant,
    H: ButtonEvents,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ButtonMachine")
            .field("input_pin", &self.input_pin)
            .field("output_pin", &self.output_pin)
            .field("state", &self.state)
            .field("claim", &self.claim)
            .finish_non_exhaustive()
    }
}
