//! Signal head outputs: vehicle lamps, pedestrian signal and buzzer.

use embedded_hal::digital::{OutputPin, PinState};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::phase::{PedestrianSignal, TrafficPhase, VehicleLamp};

/// Electrical convention for every output line.
///
/// One polarity applies to all lines; mixing conventions is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// A lit lamp is a low line.
    #[default]
    ActiveLow,

    /// A lit lamp is a high line.
    ActiveHigh,
}

impl Polarity {
    /// Pin level that puts a line in the `on` state.
    pub fn level(&self, on: bool) -> PinState {
        match (self, on) {
            (Polarity::ActiveHigh, true) | (Polarity::ActiveLow, false) => PinState::High,
            (Polarity::ActiveHigh, false) | (Polarity::ActiveLow, true) => PinState::Low,
        }
    }
}

/// Everything the signal head shows during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignalOutputs {
    pub vehicle: VehicleLamp,
    pub pedestrian: PedestrianSignal,
    pub buzzer: bool,
}

impl SignalOutputs {
    /// Outputs while nothing is present: vehicle lamps off, pedestrians go.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn for_phase(phase: Option<TrafficPhase>, buzzer: bool) -> Self {
        match phase {
            Some(phase) => Self {
                vehicle: phase.vehicle_lamp(),
                pedestrian: phase.pedestrian_signal(),
                buzzer,
            },
            None => Self::idle(),
        }
    }

    /// Logical on/off state of each line, in [`SignalLines`] order.
    pub fn line_states(&self) -> [bool; 6] {
        [
            self.vehicle.is_red(),
            self.vehicle.is_amber(),
            self.vehicle.is_green(),
            self.pedestrian == PedestrianSignal::Go,
            self.pedestrian == PedestrianSignal::Stop,
            self.buzzer,
        ]
    }
}

/// Something that can show [`SignalOutputs`].
pub trait SignalOutput: Send {
    /// Show `outputs`. Failures are logged, never returned.
    fn apply(&mut self, outputs: &SignalOutputs);

    /// The outputs last shown successfully.
    fn shown(&self) -> Option<SignalOutputs>;
}

impl<S: SignalOutput + ?Sized> SignalOutput for Box<S> {
    fn apply(&mut self, outputs: &SignalOutputs) {
        (**self).apply(outputs)
    }

    fn shown(&self) -> Option<SignalOutputs> {
        (**self).shown()
    }
}

/// The six output lines of a signal head.
#[derive(Debug)]
pub struct SignalLines<P> {
    pub red: P,
    pub amber: P,
    pub green: P,
    pub ped_go: P,
    pub ped_stop: P,
    pub buzzer: P,
}

const LINE_NAMES: [&str; 6] = ["red", "amber", "green", "ped_go", "ped_stop", "buzzer"];

/// Signal head on GPIO lines.
///
/// Lines are written only when their state changes. A line whose write failed
/// is retried on the next apply.
#[derive(Debug)]
pub struct SignalHead<P> {
    lines: SignalLines<P>,
    polarity: Polarity,
    written: [Option<bool>; 6],
    shown: Option<SignalOutputs>,
}

impl<P: OutputPin> SignalHead<P> {
    pub fn new(lines: SignalLines<P>, polarity: Polarity) -> Self {
        Self {
            lines,
            polarity,
            written: [None; 6],
            shown: None,
        }
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    fn line_mut(&mut self, index: usize) -> &mut P {
        match index {
            0 => &mut self.lines.red,
            1 => &mut self.lines.amber,
            2 => &mut self.lines.green,
            3 => &mut self.lines.ped_go,
            4 => &mut self.lines.ped_stop,
            _ => &mut self.lines.buzzer,
        }
    }
}

impl<P: OutputPin + Send> SignalOutput for SignalHead<P> {
    fn apply(&mut self, outputs: &SignalOutputs) {
        let mut ok = true;

        for (index, on) in outputs.line_states().into_iter().enumerate() {
            if self.written[index] == Some(on) {
                continue;
            }

            let level = self.polarity.level(on);
            match self.line_mut(index).set_state(level) {
                Ok(()) => {
                    trace!(line = LINE_NAMES[index], on, "Output line written");
                    self.written[index] = Some(on);
                }
                Err(e) => {
                    warn!(line = LINE_NAMES[index], error = ?e, "Output line write failed");
                    self.written[index] = None;
                    ok = false;
                }
            }
        }

        if ok {
            self.shown = Some(*outputs);
        }
    }

    fn shown(&self) -> Option<SignalOutputs> {
        self.shown
    }
}
