//! Traffic side of the gate: ultrasonic ranging, presence detection, the
//! timed phase cycle, the pedestrian alarm and the signal head outputs.
//!
//! Every component here is advanced by the controller once per tick with the
//! current monotonic instant. Nothing sleeps except the ranging call, which is
//! bounded by its echo timeout.

pub mod alarm;
pub mod lights;
pub mod phase;
pub mod presence;
pub mod range;

pub use alarm::{AlarmConfig, AlarmController, should_sound};
pub use lights::{Polarity, SignalHead, SignalLines, SignalOutput, SignalOutputs};
pub use phase::{
    PedestrianSignal, PhaseClock, PhaseTimings, PhaseTransition, TrafficPhase,
    TrafficPhaseController, VehicleLamp,
};
pub use presence::{PresenceBand, PresenceFilter};
pub use range::{DistanceSensor, PinFault, RangeSensor, measure_echo};
