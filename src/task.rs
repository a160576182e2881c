//! One polling thread per button.
//!
//! [`start`] moves a [`ButtonDescriptor`] and a pin-control implementation into a
//! new OS thread running a [`ButtonMachine`]. The returned [`ButtonTask`] is the
//! only way to stop it; stopping (or dropping the handle) blocks until the
//! thread has released both pins.

use crate::descriptor::ButtonDescriptor;
use crate::events::ButtonEvents;
use crate::machine::ButtonMachine;
use crate::pin::{PinControl, PinError};
use crate::retry::RetryPolicy;
use crate::time::{SystemClock, TimeInstant, TimeSource};
use core::fmt;
use core::marker::PhantomData;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// The polling thread could not be created.
#[derive(Debug)]
pub struct SpawnError(io::Error);

impl SpawnError {
    /// Returns the underlying OS error.
    pub fn io_error(&self) -> &io::Error {
        &self.0
    }
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to spawn button thread: {}", self.0)
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// How a button thread ended, other than by a clean stop.
#[derive(Debug)]
pub enum TaskError<E> {
    /// A pin operation failed more often than the retry policy allows.
    Pin(PinError<E>),

    /// An event callback panicked. The pins were released while unwinding.
    Panicked,
}

impl<E: fmt::Display> fmt::Display for TaskError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskError::Pin(err) => write!(f, "button thread stopped: {}", err),
            TaskError::Panicked => write!(f, "button thread panicked in an event callback"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TaskError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TaskError::Pin(err) => Some(err),
            TaskError::Panicked => None,
        }
    }
}

impl<E> From<PinError<E>> for TaskError<E> {
    fn from(err: PinError<E>) -> Self {
        TaskError::Pin(err)
    }
}

/// Starts polling a button on its own thread with default settings.
///
/// Uses [`SystemClock`], [`RetryPolicy::Forever`] and a thread named after
/// the input pin.
///
/// # Errors
/// Returns `SpawnError` if the OS refuses to create the thread. Nothing has
/// been exported in that case.
pub fn start<P, H>(descriptor: ButtonDescriptor<H>, pins: P) -> Result<ButtonTask<P::Error>, SpawnError>
where
    P: PinControl + Send + 'static,
    P::Error: Send + 'static,
    H: ButtonEvents + Send + 'static,
{
    TaskBuilder::new().start(descriptor, pins)
}

/// Configures and starts a button thread.
///
/// # Type Parameters
/// * `I` - Time instant type of the clock
/// * `T` - Time source used for press timing, pacing and retry backoff
pub struct TaskBuilder<I: TimeInstant = Instant, T = SystemClock> {
    name: Option<String>,
    stack_size: Option<usize>,
    retry: RetryPolicy<I::Duration>,
    clock: T,
    _instant: PhantomData<fn() -> I>,
}

impl TaskBuilder {
    /// Creates a builder using the system clock and unbounded retries.
    pub fn new() -> Self {
        Self {
            name: None,
            stack_size: None,
            retry: RetryPolicy::Forever,
            clock: SystemClock,
            _instant: PhantomData,
        }
    }
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<I, T> TaskBuilder<I, T>
where
    I: TimeInstant,
    T: TimeSource<I>,
{
    /// Names the thread. Defaults to `button-gpio<input pin>`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the thread's stack size in bytes.
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Sets the retry policy for pin operations.
    pub fn retry(mut self, retry: RetryPolicy<I::Duration>) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the clock.
    ///
    /// The retry policy is reset to [`RetryPolicy::Forever`] because its
    /// backoff is expressed in the old clock's duration type; set it afterwards.
    pub fn clock<I2, T2>(self, clock: T2) -> TaskBuilder<I2, T2>
    where
        I2: TimeInstant,
        T2: TimeSource<I2>,
    {
        TaskBuilder {
            name: self.name,
            stack_size: self.stack_size,
            retry: RetryPolicy::Forever,
            clock,
            _instant: PhantomData,
        }
    }

    /// Spawns the polling thread.
    ///
    /// The thread claims the pins, polls until stopped and releases the pins.
    ///
    /// # Errors
    /// Returns `SpawnError` if the OS refuses to create the thread.
    pub fn start<P, H>(
        self,
        descriptor: ButtonDescriptor<H>,
        pins: P,
    ) -> Result<ButtonTask<P::Error>, SpawnError>
    where
        P: PinControl + Send + 'static,
        P::Error: Send + 'static,
        H: ButtonEvents + Send + 'static,
        T: Send + 'static,
        I: Send + 'static,
        I::Duration: Send + 'static,
    {
        let name = self
            .name
            .unwrap_or_else(|| format!("button-gpio{}", descriptor.input_pin()));
        let mut thread = thread::Builder::new().name(name.clone());
        if let Some(bytes) = self.stack_size {
            thread = thread.stack_size(bytes);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let machine = ButtonMachine::new(descriptor, pins, self.clock).with_retry(self.retry);
        let stop_flag = Arc::clone(&cancel);

        let handle = thread
            .spawn(move || machine.run(&*stop_flag))
            .map_err(|err| {
                log::error!("{}: {}", name, err);
                SpawnError(err)
            })?;

        log::info!("{}: started", name);
        Ok(ButtonTask {
            name,
            cancel,
            thread: Some(handle),
        })
    }
}

impl<I: TimeInstant, T: fmt::Debug> fmt::Debug for TaskBuilder<I, T>
where
    I::Duration: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBuilder")
            .field("name", &self.name)
            .field("stack_size", &self.stack_size)
            .field("retry", &self.retry)
            .field("clock", &self.clock)
            .finish()
    }
}

/// Handle to a running button thread.
///
/// Dropping the handle stops the thread and waits for it, like [`stop`](Self::stop)
/// but discarding the outcome.
pub struct ButtonTask<E> {
    name: String,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), PinError<E>>>>,
}

impl<E> ButtonTask<E> {
    /// Returns the thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asks the thread to stop without waiting for it.
    ///
    /// The thread notices at its next cancellation point, releases the pins and exits.
    pub fn request_stop(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Returns true if the thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the thread and waits until it has released both pins.
    ///
    /// # Errors
    /// * `Pin` - The thread had already ended because a bounded retry gave up
    /// * `Panicked` - An event callback panicked
    pub fn stop(mut self) -> Result<(), TaskError<E>> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), TaskError<E>> {
        self.request_stop();
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };

        let outcome = match thread.join() {
            Ok(result) => result.map_err(TaskError::Pin),
            Err(_) => Err(TaskError::Panicked),
        };
        log::info!("{}: stopped", self.name);
        outcome
    }
}

impl<E> Drop for ButtonTask<E> {
    fn drop(&mut self) {
        match self.shutdown() {
            Ok(()) => {}
            Err(TaskError::Panicked) => log::warn!("{}: event callback panicked", self.name),
            Err(TaskError::Pin(err)) => log::warn!(
                "{}: {} gpio{} gave up after {} attempts",
                self.name,
                err.op,
                err.pin,
                err.attempts
            ),
        }
    }
}

impl<E> fmt::Debug for ButtonTask<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonTask")
            .field("name", &self.name)
            .field("stop_requested", &self.cancel.load(Ordering::Relaxed))
            .field("finished", &self.is_finished())
            .finish()
    }
}
