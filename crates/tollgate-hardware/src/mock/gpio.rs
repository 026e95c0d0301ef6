//! Mock GPIO pins and delay provider for the ultrasonic ranging path.
//!
//! [`UltrasonicRig`] wires a trigger pin, an echo pin and a delay provider to
//! one virtual clock. Only the delay provider advances the clock, so a
//! measurement runs instantly and deterministically in tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tollgate_core::constants::METERS_PER_ECHO_MICROSECOND;

/// Delay between the trigger falling edge and the echo rising edge.
pub const ECHO_START_DELAY_US: u64 = 100;

const NO_TRIGGER: u64 = u64::MAX;

/// Error raised by a mock pin with an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinFault;

impl digital::Error for MockPinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl std::fmt::Display for MockPinFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mock pin fault")
    }
}

impl std::error::Error for MockPinFault {}

/// Standalone output pin that records its level.
///
/// Clones share the same line, so a test can keep one clone and hand the
/// other to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockOutputPin {
    high: Arc<AtomicBool>,
    fault: Arc<AtomicBool>,
    writes: Arc<AtomicU64>,
}

impl MockOutputPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set_high(&self) -> bool {
        self.high.load(Ordering::SeqCst)
    }

    /// Number of successful writes to this line.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every following write fail until cleared.
    pub fn set_fault(&self, fault: bool) {
        self.fault.store(fault, Ordering::SeqCst);
    }

    fn write(&self, high: bool) -> Result<(), MockPinFault> {
        if self.fault.load(Ordering::SeqCst) {
            return Err(MockPinFault);
        }
        self.high.store(high, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl ErrorType for MockOutputPin {
    type Error = MockPinFault;
}

impl OutputPin for MockOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

#[derive(Debug)]
struct RigState {
    now_ns: AtomicU64,
    trigger_high: AtomicBool,
    trigger_fell_at_ns: AtomicU64,
    echo_width_ns: AtomicU64,
    no_echo: AtomicBool,
    fault: AtomicBool,
}

/// Simulated HC-SR04 style sensor.
///
/// # Examples
///
/// ```
/// use tollgate_hardware::mock::UltrasonicRig;
///
/// let rig = UltrasonicRig::new();
/// rig.set_distance(1.0);
/// let (trigger, echo, delay) = rig.parts();
/// # let _ = (trigger, echo, delay);
/// ```
#[derive(Debug, Clone)]
pub struct UltrasonicRig {
    state: Arc<RigState>,
}

impl UltrasonicRig {
    /// Create a rig with nothing in range.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RigState {
                now_ns: AtomicU64::new(0),
                trigger_high: AtomicBool::new(false),
                trigger_fell_at_ns: AtomicU64::new(NO_TRIGGER),
                echo_width_ns: AtomicU64::new(0),
                no_echo: AtomicBool::new(true),
                fault: AtomicBool::new(false),
            }),
        }
    }

    /// Place an object `meters` away from the sensor.
    pub fn set_distance(&self, meters: f32) {
        let width_us = (meters / METERS_PER_ECHO_MICROSECOND).round() as u64;
        self.state
            .echo_width_ns
            .store(width_us * 1_000, Ordering::SeqCst);
        self.state.no_echo.store(false, Ordering::SeqCst);
    }

    /// Remove the object; the echo line never rises.
    pub fn set_no_echo(&self) {
        self.state.no_echo.store(true, Ordering::SeqCst);
    }

    /// Make the pins fail every operation until cleared.
    pub fn set_fault(&self, fault: bool) {
        self.state.fault.store(fault, Ordering::SeqCst);
    }

    /// Virtual time elapsed, in microseconds.
    pub fn elapsed_us(&self) -> u64 {
        self.state.now_ns.load(Ordering::SeqCst) / 1_000
    }

    /// Split the rig into its trigger pin, echo pin and delay provider.
    pub fn parts(&self) -> (MockTriggerPin, MockEchoPin, MockDelay) {
        (
            MockTriggerPin {
                state: Arc::clone(&self.state),
            },
            MockEchoPin {
                state: Arc::clone(&self.state),
            },
            MockDelay {
                state: Arc::clone(&self.state),
            },
        )
    }
}

impl Default for UltrasonicRig {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger line of an [`UltrasonicRig`].
#[derive(Debug)]
pub struct MockTriggerPin {
    state: Arc<RigState>,
}

impl ErrorType for MockTriggerPin {
    type Error = MockPinFault;
}

impl OutputPin for MockTriggerPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.state.fault.load(Ordering::SeqCst) {
            return Err(MockPinFault);
        }
        // A falling edge starts a ping
        if self.state.trigger_high.swap(false, Ordering::SeqCst) {
            let now = self.state.now_ns.load(Ordering::SeqCst);
            self.state.trigger_fell_at_ns.store(now, Ordering::SeqCst);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.state.fault.load(Ordering::SeqCst) {
            return Err(MockPinFault);
        }
        self.state.trigger_high.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Echo line of an [`UltrasonicRig`].
#[derive(Debug)]
pub struct MockEchoPin {
    state: Arc<RigState>,
}

impl MockEchoPin {
    fn level(&self) -> Result<bool, MockPinFault> {
        let state = &self.state;
        if state.fault.load(Ordering::SeqCst) {
            return Err(MockPinFault);
        }
        if state.no_echo.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let fell_at = state.trigger_fell_at_ns.load(Ordering::SeqCst);
        if fell_at == NO_TRIGGER {
            return Ok(false);
        }

        let now = state.now_ns.load(Ordering::SeqCst);
        let rise = fell_at + ECHO_START_DELAY_US * 1_000;
        let fall = rise + state.echo_width_ns.load(Ordering::SeqCst);
        Ok(now >= rise && now < fall)
    }
}

impl ErrorType for MockEchoPin {
    type Error = MockPinFault;
}

impl InputPin for MockEchoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.level()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.level().map(|high| !high)
    }
}

/// Delay provider that advances the rig's virtual clock.
#[derive(Debug)]
pub struct MockDelay {
    state: Arc<RigState>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.state
            .now_ns
            .fetch_add(u64::from(ns), Ordering::SeqCst);
    }
}
