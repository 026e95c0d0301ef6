//! Ultrasonic time-of-flight ranging over `embedded-hal` pins.
//!
//! The sensor is pinged with a short trigger pulse and answers by holding its
//! echo line high for as long as the sound took to travel out and back. The
//! echo duration is measured by polling in 1 µs steps, so the whole call is
//! bounded by the configured timeout.

use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, InputPin, OutputPin};
use tracing::{trace, warn};

use tollgate_core::constants::{
    DEFAULT_ECHO_TIMEOUT_MS, ECHO_POLL_STEP_US, METERS_PER_ECHO_MICROSECOND, TRIGGER_PULSE_US,
    TRIGGER_SETTLE_US,
};
use tollgate_core::{DistanceReading, Echo, Error, SensorId};

/// A source of one distance reading per tick.
///
/// The controller owns its sensors through this trait so that vehicle and
/// pedestrian sensors of different pin types can live side by side.
pub trait DistanceSensor: Send {
    fn sensor_id(&self) -> &SensorId;

    /// Take one reading. Must return within the sensor's echo timeout.
    fn measure(&mut self, now: Instant) -> DistanceReading;
}

impl<S: DistanceSensor + ?Sized> DistanceSensor for Box<S> {
    fn sensor_id(&self) -> &SensorId {
        (**self).sensor_id()
    }

    fn measure(&mut self, now: Instant) -> DistanceReading {
        (**self).measure(now)
    }
}

/// A pin operation failed during a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinFault {
    Trigger(ErrorKind),
    Echo(ErrorKind),
}

impl std::fmt::Display for PinFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinFault::Trigger(kind) => write!(f, "trigger pin fault: {kind:?}"),
            PinFault::Echo(kind) => write!(f, "echo pin fault: {kind:?}"),
        }
    }
}

fn trigger_fault<E: digital::Error>(e: E) -> PinFault {
    PinFault::Trigger(e.kind())
}

fn echo_fault<E: digital::Error>(e: E) -> PinFault {
    PinFault::Echo(e.kind())
}

/// Ping once and measure the echo.
///
/// Returns [`Echo::NoEcho`] if the echo does not rise, or is still high, once
/// `timeout_us` has been spent waiting after the trigger pulse.
///
/// # Errors
///
/// Returns a [`PinFault`] if either pin reports an error.
pub fn measure_echo<T, E, D>(
    trigger: &mut T,
    echo: &mut E,
    delay: &mut D,
    timeout_us: u32,
) -> Result<Echo, PinFault>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    trigger.set_low().map_err(trigger_fault)?;
    delay.delay_us(TRIGGER_SETTLE_US);
    trigger.set_high().map_err(trigger_fault)?;
    delay.delay_us(TRIGGER_PULSE_US);
    trigger.set_low().map_err(trigger_fault)?;

    let mut waited_us: u32 = 0;

    while echo.is_low().map_err(echo_fault)? {
        if waited_us >= timeout_us {
            return Ok(Echo::NoEcho);
        }
        delay.delay_us(ECHO_POLL_STEP_US);
        waited_us += ECHO_POLL_STEP_US;
    }

    let mut high_us: u32 = 0;

    while echo.is_high().map_err(echo_fault)? {
        if waited_us >= timeout_us {
            return Ok(Echo::NoEcho);
        }
        delay.delay_us(ECHO_POLL_STEP_US);
        waited_us += ECHO_POLL_STEP_US;
        high_us += ECHO_POLL_STEP_US;
    }

    Ok(Echo::Distance(high_us as f32 * METERS_PER_ECHO_MICROSECOND))
}

/// HC-SR04 style sensor on a trigger/echo pin pair.
///
/// # Examples
///
/// ```
/// use std::time::Instant;
/// use tollgate_core::SensorId;
/// use tollgate_hardware::mock::UltrasonicRig;
/// use tollgate_traffic::RangeSensor;
///
/// let rig = UltrasonicRig::new();
/// rig.set_distance(1.0);
/// let (trigger, echo, delay) = rig.parts();
///
/// let mut sensor = RangeSensor::new(SensorId::new("vehicle-left"), trigger, echo, delay);
/// let reading = sensor.measure(Instant::now());
/// let meters = reading.echo.meters().unwrap();
/// assert!((meters - 1.0).abs() < 0.01);
/// ```
#[derive(Debug)]
pub struct RangeSensor<T, E, D> {
    id: SensorId,
    trigger: T,
    echo: E,
    delay: D,
    timeout: Duration,
}

impl<T, E, D> RangeSensor<T, E, D>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
{
    pub fn new(id: SensorId, trigger: T, echo: E, delay: D) -> Self {
        Self {
            id,
            trigger,
            echo,
            delay,
            timeout: Duration::from_millis(DEFAULT_ECHO_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Take one reading. Pin faults degrade to [`Echo::NoEcho`].
    pub fn measure(&mut self, now: Instant) -> DistanceReading {
        let timeout_us = u32::try_from(self.timeout.as_micros()).unwrap_or(u32::MAX);

        let result = measure_echo(&mut self.trigger, &mut self.echo, &mut self.delay, timeout_us);
        let echo = match result {
            Ok(echo) => echo,
            Err(fault) => {
                warn!(sensor = %self.id, %fault, "Ranging failed, treating as no echo");
                Echo::NoEcho
            }
        };

        if echo == Echo::NoEcho {
            let timeout = Error::SensorTimeout {
                sensor: self.id.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            };
            trace!(sensor = %self.id, "{timeout}");
        }

        DistanceReading::new(self.id.clone(), echo, now)
    }
}

impl<T, E, D> DistanceSensor for RangeSensor<T, E, D>
where
    T: OutputPin + Send,
    E: InputPin + Send,
    D: DelayNs + Send,
{
    fn sensor_id(&self) -> &SensorId {
        &self.id
    }

    fn measure(&mut self, now: Instant) -> DistanceReading {
        RangeSensor::measure(self, now)
    }
}
