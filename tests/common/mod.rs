//! Shared test infrastructure for gpio-button integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use gpio_button::{
    ButtonDescriptor, ButtonEvent, ButtonEvents, ButtonMachine, Cancellation, Direction, Level,
    PinControl, PinError, PinNumber, PinOp, TimeDuration, TimeInstant, TimeSource,
};
use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const INPUT: PinNumber = 20;
pub const OUTPUT: PinNumber = 21;

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    fn as_millis(&self) -> u64 {
        self.0
    }

    fn from_millis(millis: u64) -> Self {
        TestDuration(millis)
    }

    fn from_micros(micros: u64) -> Self {
        TestDuration(micros / 1_000)
    }
}

/// Mock instant type for testing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0.saturating_sub(earlier.0))
    }
}

// ============================================================================
// Mock Time Source
// ============================================================================

/// Mock clock with controllable time; sleeping advances it instantly.
///
/// Clones share the same time, so one copy can be handed to a machine while
/// the test keeps another.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now: Arc<AtomicU64>,
    slept: Arc<AtomicU64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance time by the given number of milliseconds
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set_time(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    /// Total time spent in `sleep`
    pub fn slept_ms(&self) -> u64 {
        self.slept.load(Ordering::SeqCst)
    }
}

impl TimeSource<TestInstant> for MockClock {
    fn now(&self) -> TestInstant {
        TestInstant(self.now_ms())
    }

    fn sleep(&self, duration: TestDuration) {
        self.slept.fetch_add(duration.0, Ordering::SeqCst);
        self.advance(duration.0);
    }
}

// ============================================================================
// Scripted Pins
// ============================================================================

/// Every pin-control call the machine made, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCall {
    Export(PinNumber),
    Unexport(PinNumber),
    SetDirection(PinNumber, Direction),
    Read(PinNumber),
    Write(PinNumber, Level),
}

/// One scripted input reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    /// Level, optionally jumping the clock to an absolute time (ms) first.
    Level(Level, Option<u64>),
    /// The read fails.
    Fail,
}

pub fn low() -> Reading {
    Reading::Level(Level::Low, None)
}

pub fn high() -> Reading {
    Reading::Level(Level::High, None)
}

pub fn low_at(millis: u64) -> Reading {
    Reading::Level(Level::Low, Some(millis))
}

pub fn high_at(millis: u64) -> Reading {
    Reading::Level(Level::High, Some(millis))
}

/// Converts raw 0/1 levels into readings without timestamps.
pub fn levels(raw: &[u8]) -> Vec<Reading> {
    raw.iter()
        .map(|&r| if r == 0 { low() } else { high() })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockError(pub &'static str);

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl std::error::Error for MockError {}

#[derive(Debug)]
struct PinsState {
    script: VecDeque<Reading>,
    calls: Vec<PinCall>,
    failures: Vec<(PinOp, u32)>,
    gate: Option<Receiver<()>>,
    after_script: Level,
}

/// Pin control that plays back a script of input readings.
///
/// When the script runs out, reads return `after_script` (high unless
/// [`hold_when_exhausted`](Self::hold_when_exhausted) was called), are no
/// longer recorded, and the [`exhausted`](Self::exhausted) flag is raised.
/// Tests use that flag as the machine's stop request.
#[derive(Debug, Clone)]
pub struct ScriptedPins {
    state: Arc<Mutex<PinsState>>,
    clock: MockClock,
    exhausted: Arc<AtomicBool>,
}

impl ScriptedPins {
    pub fn new(clock: &MockClock, script: impl IntoIterator<Item = Reading>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PinsState {
                script: script.into_iter().collect(),
                calls: Vec::new(),
                failures: Vec::new(),
                gate: None,
                after_script: Level::High,
            })),
            clock: clock.clone(),
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reads after the script report the button as still held.
    pub fn hold_when_exhausted(self) -> Self {
        self.state.lock().unwrap().after_script = Level::Low;
        self
    }

    /// The next `times` calls of `op` fail.
    pub fn fail_next(&self, op: PinOp, times: u32) {
        self.state.lock().unwrap().failures.push((op, times));
    }

    /// The first export blocks until the returned sender fires (or is dropped).
    pub fn gated(self) -> (Self, Sender<()>) {
        let (tx, rx) = channel();
        self.state.lock().unwrap().gate = Some(rx);
        (self, tx)
    }

    pub fn calls(&self) -> Vec<PinCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, call: PinCall) -> usize {
        self.calls().iter().filter(|&&c| c == call).count()
    }

    pub fn exhausted(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exhausted)
    }

    fn record(&self, call: PinCall, op: PinOp) -> Result<(), MockError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if let Some(entry) = state.failures.iter_mut().find(|(o, n)| *o == op && *n > 0) {
            entry.1 -= 1;
            return Err(MockError("injected failure"));
        }
        Ok(())
    }
}

impl PinControl for ScriptedPins {
    type Error = MockError;

    fn export(&mut self, pin: PinNumber) -> Result<(), MockError> {
        let gate = self.state.lock().unwrap().gate.take();
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        self.record(PinCall::Export(pin), PinOp::Export)
    }

    fn unexport(&mut self, pin: PinNumber) -> Result<(), MockError> {
        self.record(PinCall::Unexport(pin), PinOp::Unexport)
    }

    fn set_direction(&mut self, pin: PinNumber, direction: Direction) -> Result<(), MockError> {
        self.record(PinCall::SetDirection(pin, direction), PinOp::SetDirection)
    }

    fn read_level(&mut self, pin: PinNumber) -> Result<Level, MockError> {
        let mut state = self.state.lock().unwrap();
        match state.script.pop_front() {
            Some(Reading::Level(level, at)) => {
                state.calls.push(PinCall::Read(pin));
                if let Some(millis) = at {
                    self.clock.set_time(millis);
                }
                Ok(level)
            }
            Some(Reading::Fail) => {
                state.calls.push(PinCall::Read(pin));
                Err(MockError("read failed"))
            }
            None => {
                self.exhausted.store(true, Ordering::SeqCst);
                Ok(state.after_script)
            }
        }
    }

    fn write_level(&mut self, pin: PinNumber, level: Level) -> Result<(), MockError> {
        self.record(PinCall::Write(pin, level), PinOp::Write)
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

/// Handler that records every event it receives.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<heapless::Vec<ButtonEvent, 64>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ButtonEvent> {
        self.events.lock().unwrap().iter().copied().collect()
    }

    /// Polls until at least `count` events arrived or `timeout` passed.
    pub fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.events.lock().unwrap().len() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }
}

impl ButtonEvents for Recorder {
    fn on_press_down(&mut self) {
        let _ = self.events.lock().unwrap().push(ButtonEvent::PressDown);
    }

    fn on_press_up(&mut self) {
        let _ = self.events.lock().unwrap().push(ButtonEvent::PressUp);
    }

    fn on_long_click(&mut self) {
        let _ = self.events.lock().unwrap().push(ButtonEvent::LongClick);
    }
}

/// Handler that panics on press-down.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicOnPress;

impl ButtonEvents for PanicOnPress {
    fn on_press_down(&mut self) {
        panic!("press-down handler failed");
    }

    fn on_press_up(&mut self) {}

    fn on_long_click(&mut self) {}
}

// ============================================================================
// Cancellation Helpers
// ============================================================================

/// Lets `checks` cancellation checks pass, then reports a stop request.
#[derive(Debug)]
pub struct CancelAfter {
    remaining: Cell<u32>,
}

impl CancelAfter {
    pub fn new(checks: u32) -> Self {
        Self {
            remaining: Cell::new(checks),
        }
    }
}

impl Cancellation for CancelAfter {
    fn is_cancelled(&self) -> bool {
        match self.remaining.get() {
            0 => true,
            n => {
                self.remaining.set(n - 1);
                false
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub type TestMachine<H = Recorder> = ButtonMachine<ScriptedPins, MockClock, TestInstant, H>;

/// Descriptor on [`INPUT`]/[`OUTPUT`] with the given polling rate.
pub fn descriptor<H: ButtonEvents>(handler: H, polling_rate: u32) -> ButtonDescriptor<H> {
    ButtonDescriptor::new(INPUT, OUTPUT, polling_rate, handler).unwrap()
}

/// Result of running a machine over a script until the script runs out.
pub struct ScriptRun {
    pub events: Vec<ButtonEvent>,
    pub calls: Vec<PinCall>,
    pub clock: MockClock,
    pub result: Result<(), PinError<MockError>>,
}

/// Runs a machine at 100 Hz over `script` until the script runs out.
pub fn run_script(script: impl IntoIterator<Item = Reading>) -> ScriptRun {
    let clock = MockClock::new();
    let pins = ScriptedPins::new(&clock, script);
    let recorder = Recorder::new();
    let stop = pins.exhausted();

    let machine: TestMachine =
        ButtonMachine::new(descriptor(recorder.clone(), 100), pins.clone(), clock.clone());
    let result = machine.run(&*stop);

    ScriptRun {
        events: recorder.events(),
        calls: pins.calls(),
        clock,
        result,
    }
}

/// Events expected from raw levels: one press-down per run of lows and one
/// press-up per run of highs that follows a press. No long-clicks.
pub fn expected_events(raw: &[u8]) -> Vec<ButtonEvent> {
    let mut events = Vec::new();
    let mut previous = None;
    for &level in raw {
        if previous != Some(level) {
            match level {
                0 => events.push(ButtonEvent::PressDown),
                _ if previous.is_some() => events.push(ButtonEvent::PressUp),
                _ => {}
            }
        }
        previous = Some(level);
    }
    // The script ending while held still reads as a release.
    if previous == Some(0) {
        events.push(ButtonEvent::PressUp);
    }
    events
}

/// The four setup calls, in the order the machine must make them.
pub fn setup_calls() -> [PinCall; 4] {
    [
        PinCall::Export(OUTPUT),
        PinCall::Export(INPUT),
        PinCall::SetDirection(OUTPUT, Direction::Out),
        PinCall::SetDirection(INPUT, Direction::In),
    ]
}

/// The two teardown calls, in order.
pub fn teardown_calls() -> [PinCall; 2] {
    [PinCall::Unexport(OUTPUT), PinCall::Unexport(INPUT)]
}
