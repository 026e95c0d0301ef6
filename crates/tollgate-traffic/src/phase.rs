//! Traffic phase state machine.
//!
//! This module provides the timed light cycle shown to vehicles and
//! pedestrians at the gate.
//!
//! # Phases
//!
//! - `Red`: vehicles stop, pedestrians may cross
//! - `RedAmber`: vehicles prepare to go, pedestrians stop
//! - `Green`: vehicles go
//! - `Amber`: vehicles prepare to stop
//!
//! # Valid Transitions
//!
//! - Red → RedAmber → Green → Amber → Red
//!
//! The cycle advances on elapsed time only. Presence gates entry into the
//! cycle and is otherwise read once per cycle, when `Amber` ends: with
//! presence the cycle starts again at `Red`, without it the controller goes
//! idle. A phase in progress always runs its full hold, so the lights never
//! drop out of `Green` without passing through `Amber`. While idle the
//! outputs are forced to the idle combination and the phase clock is parked.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, Instant};
//! use tollgate_traffic::{PhaseTimings, TrafficPhase, TrafficPhaseController};
//!
//! let mut controller = TrafficPhaseController::new(PhaseTimings::default());
//! let t0 = Instant::now();
//!
//! assert_eq!(controller.tick(false, t0), None);
//! assert_eq!(controller.tick(true, t0), Some(TrafficPhase::Red));
//! assert_eq!(
//!     controller.tick(true, t0 + Duration::from_secs(30)),
//!     Some(TrafficPhase::RedAmber)
//! );
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tollgate_core::constants::{
    DEFAULT_AMBER_MS, DEFAULT_GREEN_MS, DEFAULT_RED_AMBER_MS, DEFAULT_RED_MS,
};

/// Maximum number of phase transitions to keep in history.
///
/// 100 transitions is 25 full cycles, enough to see what the lights did
/// around an incident.
const MAX_HISTORY_SIZE: usize = 100;

/// One phase of the vehicle light cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficPhase {
    /// Vehicles stop. Entry phase of every cycle.
    Red,

    /// Vehicles prepare to go.
    RedAmber,

    /// Vehicles go.
    Green,

    /// Vehicles prepare to stop.
    Amber,
}

impl fmt::Display for TrafficPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase_str = match self {
            TrafficPhase::Red => "RED",
            TrafficPhase::RedAmber => "RED_AMBER",
            TrafficPhase::Green => "GREEN",
            TrafficPhase::Amber => "AMBER",
        };
        write!(f, "{}", phase_str)
    }
}

impl TrafficPhase {
    /// All phases in cycle order.
    pub const CYCLE: [TrafficPhase; 4] = [
        TrafficPhase::Red,
        TrafficPhase::RedAmber,
        TrafficPhase::Green,
        TrafficPhase::Amber,
    ];

    /// The phase that follows this one.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_traffic::TrafficPhase;
    ///
    /// assert_eq!(TrafficPhase::Amber.next(), TrafficPhase::Red);
    /// ```
    pub fn next(&self) -> TrafficPhase {
        match self {
            TrafficPhase::Red => TrafficPhase::RedAmber,
            TrafficPhase::RedAmber => TrafficPhase::Green,
            TrafficPhase::Green => TrafficPhase::Amber,
            TrafficPhase::Amber => TrafficPhase::Red,
        }
    }

    /// Check if transition to target phase is valid from this phase.
    ///
    /// Only the next phase of the cycle is reachable.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_traffic::TrafficPhase;
    ///
    /// assert!(TrafficPhase::Red.can_transition_to(&TrafficPhase::RedAmber));
    /// assert!(!TrafficPhase::Red.can_transition_to(&TrafficPhase::Green));
    /// ```
    pub fn can_transition_to(&self, target: &TrafficPhase) -> bool {
        matches!(
            (self, target),
            (TrafficPhase::Red, TrafficPhase::RedAmber)
                | (TrafficPhase::RedAmber, TrafficPhase::Green)
                | (TrafficPhase::Green, TrafficPhase::Amber)
                | (TrafficPhase::Amber, TrafficPhase::Red)
        )
    }

    /// The single vehicle lamp lit during this phase.
    ///
    /// `RedAmber` lights the amber lamp only, so that at most one vehicle
    /// lamp is ever lit.
    pub fn vehicle_lamp(&self) -> VehicleLamp {
        match self {
            TrafficPhase::Red => VehicleLamp::Red,
            TrafficPhase::RedAmber | TrafficPhase::Amber => VehicleLamp::Amber,
            TrafficPhase::Green => VehicleLamp::Green,
        }
    }

    /// The pedestrian signal shown during this phase.
    pub fn pedestrian_signal(&self) -> PedestrianSignal {
        match self {
            TrafficPhase::Red => PedestrianSignal::Go,
            TrafficPhase::RedAmber | TrafficPhase::Green | TrafficPhase::Amber => {
                PedestrianSignal::Stop
            }
        }
    }
}

/// The lit vehicle lamp. A value of this type can only name one lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleLamp {
    #[default]
    Off,
    Red,
    Amber,
    Green,
}

impl VehicleLamp {
    pub fn is_red(&self) -> bool {
        matches!(self, VehicleLamp::Red)
    }

    pub fn is_amber(&self) -> bool {
        matches!(self, VehicleLamp::Amber)
    }

    pub fn is_green(&self) -> bool {
        matches!(self, VehicleLamp::Green)
    }
}

/// The pedestrian signal. Exactly one of go/stop is lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PedestrianSignal {
    #[default]
    Go,
    Stop,
}

/// Hold duration per phase, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseTimings {
    pub red_ms: u64,
    pub red_amber_ms: u64,
    pub green_ms: u64,
    pub amber_ms: u64,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            red_ms: DEFAULT_RED_MS,
            red_amber_ms: DEFAULT_RED_AMBER_MS,
            green_ms: DEFAULT_GREEN_MS,
            amber_ms: DEFAULT_AMBER_MS,
        }
    }
}

impl PhaseTimings {
    /// How long `phase` is held before the cycle advances.
    pub fn hold(&self, phase: TrafficPhase) -> Duration {
        let ms = match phase {
            TrafficPhase::Red => self.red_ms,
            TrafficPhase::RedAmber => self.red_amber_ms,
            TrafficPhase::Green => self.green_ms,
            TrafficPhase::Amber => self.amber_ms,
        };
        Duration::from_millis(ms)
    }

    /// Length of one full cycle.
    pub fn cycle(&self) -> Duration {
        TrafficPhase::CYCLE.iter().map(|p| self.hold(*p)).sum()
    }

    /// Evaluate the cycle for one tick.
    ///
    /// Returns `phase` while it is still within its hold duration, otherwise
    /// the next phase. Never skips more than one phase, whatever `elapsed` is.
    pub fn evaluate(&self, phase: TrafficPhase, elapsed: Duration) -> TrafficPhase {
        if elapsed >= self.hold(phase) {
            phase.next()
        } else {
            phase
        }
    }
}

/// The current phase and when it was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseClock {
    current_phase: TrafficPhase,
    phase_entered_at: Instant,
}

impl PhaseClock {
    fn start(now: Instant) -> Self {
        Self {
            current_phase: TrafficPhase::Red,
            phase_entered_at: now,
        }
    }

    pub fn current_phase(&self) -> TrafficPhase {
        self.current_phase
    }

    pub fn phase_entered_at(&self) -> Instant {
        self.phase_entered_at
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.phase_entered_at)
    }
}

/// A single phase change with the instant it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    /// `None` when the cycle was entered from idle.
    pub from: Option<TrafficPhase>,
    pub to: TrafficPhase,
    pub at: Instant,
}

/// Timed traffic phase controller.
///
/// Owns the [`PhaseClock`] exclusively. The clock is created when presence
/// starts a cycle and dropped (parked) at the end of an `Amber` hold with no
/// presence.
///
/// # Thread Safety
///
/// Not shared between threads; the tick loop owns it.
#[derive(Debug)]
pub struct TrafficPhaseController {
    timings: PhaseTimings,
    clock: Option<PhaseClock>,
    history: VecDeque<PhaseTransition>,
}

impl TrafficPhaseController {
    /// Create an idle controller.
    pub fn new(timings: PhaseTimings) -> Self {
        Self {
            timings,
            clock: None,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn timings(&self) -> &PhaseTimings {
        &self.timings
    }

    /// The active phase, or `None` while idle.
    pub fn current_phase(&self) -> Option<TrafficPhase> {
        self.clock.map(|c| c.current_phase)
    }

    pub fn clock(&self) -> Option<&PhaseClock> {
        self.clock.as_ref()
    }

    /// Recent phase changes, oldest first.
    pub fn history(&self) -> &VecDeque<PhaseTransition> {
        &self.history
    }

    /// Advance the cycle for one tick.
    ///
    /// # Arguments
    ///
    /// * `present` - Debounced vehicle presence for this tick. Only read
    ///   while idle and when `Amber` ends.
    /// * `now` - Tick instant
    ///
    /// # Returns
    ///
    /// The phase active after this tick, or `None` while idle.
    pub fn tick(&mut self, present: bool, now: Instant) -> Option<TrafficPhase> {
        let Some(mut clock) = self.clock else {
            if !present {
                return None;
            }
            let clock = PhaseClock::start(now);
            self.clock = Some(clock);
            info!(phase = %clock.current_phase, "Presence detected, cycle started");
            self.record(None, clock.current_phase, now);
            return Some(clock.current_phase);
        };

        let from = clock.current_phase;
        let to = self.timings.evaluate(from, clock.elapsed(now));
        if to == from {
            return Some(from);
        }

        if to == TrafficPhase::Red && !present {
            self.clock = None;
            info!(phase = %from, "Cycle finished without presence, lights idle");
            return None;
        }

        debug_assert!(from.can_transition_to(&to));
        clock.current_phase = to;
        clock.phase_entered_at = now;
        self.clock = Some(clock);
        info!(from = %from, to = %to, "Traffic phase changed");
        self.record(Some(from), to, now);
        Some(to)
    }

    /// Vehicle lamp and pedestrian signal for the current state.
    pub fn outputs(&self) -> (VehicleLamp, PedestrianSignal) {
        match self.current_phase() {
            Some(phase) => (phase.vehicle_lamp(), phase.pedestrian_signal()),
            None => (VehicleLamp::Off, PedestrianSignal::Go),
        }
    }

    fn record(&mut self, from: Option<TrafficPhase>, to: TrafficPhase, at: Instant) {
        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(PhaseTransition { from, to, at });
        debug!(history_len = self.history.len(), "Recorded phase transition");
    }
}

impl Default for TrafficPhaseController {
    fn default() -> Self {
        Self::new(PhaseTimings::default())
    }
}
