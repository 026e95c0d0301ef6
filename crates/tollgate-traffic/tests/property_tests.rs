//! Property-based tests for presence detection and the light cycle.

use std::time::{Duration, Instant};

use proptest::prelude::*;
use tollgate_core::{DistanceReading, Echo, SensorId};
use tollgate_traffic::{
    AlarmController, PhaseTimings, PresenceBand, PresenceFilter, SignalOutputs, TrafficPhase,
    TrafficPhaseController,
};

fn reading(echo: Echo) -> DistanceReading {
    DistanceReading::new(SensorId::new("prop"), echo, Instant::now())
}

/// Strategy for tick steps between 1 ms and 10 s.
fn tick_steps() -> impl Strategy<Value = Vec<(u64, bool)>> {
    prop::collection::vec((1u64..10_000, any::<bool>()), 1..300)
}

/// Strategy for small hold durations so cycles actually happen.
fn timings() -> impl Strategy<Value = PhaseTimings> {
    (1u64..2_000, 1u64..2_000, 1u64..2_000, 1u64..2_000).prop_map(
        |(red_ms, red_amber_ms, green_ms, amber_ms)| PhaseTimings {
            red_ms,
            red_amber_ms,
            green_ms,
            amber_ms,
        },
    )
}

proptest! {
    /// Property: readings strictly inside the band are present.
    #[test]
    fn prop_inside_band_is_present(m in 0.2501f32..2.2499) {
        let filter = PresenceFilter::default();
        prop_assert!(filter.is_occupied(&reading(Echo::Distance(m))));
    }

    /// Property: readings outside the band are absent.
    #[test]
    fn prop_outside_band_is_absent(m in prop_oneof![0.0f32..0.2499, 2.2501f32..50.0]) {
        let filter = PresenceFilter::default();
        prop_assert!(!filter.is_occupied(&reading(Echo::Distance(m))));
        prop_assert!(!filter.is_occupied(&reading(Echo::NoEcho)));
    }

    /// Property: presence over several sensors is the OR of each sensor.
    #[test]
    fn prop_presence_is_or(distances in prop::collection::vec(0.0f32..4.0, 0..4)) {
        let filter = PresenceFilter::new(PresenceBand::default());
        let readings: Vec<_> = distances.iter().map(|m| reading(Echo::Distance(*m))).collect();
        let expected = readings.iter().any(|r| filter.is_occupied(r));
        prop_assert_eq!(filter.is_present(&readings), expected);
    }

    /// Property: no tick sequence ever lights two vehicle lamps.
    #[test]
    fn prop_single_vehicle_lamp(timings in timings(), steps in tick_steps()) {
        let mut controller = TrafficPhaseController::new(timings);
        let mut alarm = AlarmController::default();
        let mut now = Instant::now();

        for (step_ms, present) in steps {
            now += Duration::from_millis(step_ms);
            let phase = controller.tick(present, now);
            let buzzer = alarm.tick(phase, present, now);
            let lines = SignalOutputs::for_phase(phase, buzzer).line_states();
            prop_assert!(lines[..3].iter().filter(|on| **on).count() <= 1);
        }
    }

    /// Property: with presence held, the cycle follows its order and every
    /// phase lasts at least its hold duration.
    #[test]
    fn prop_cycle_order_and_holds(
        timings in timings(),
        steps in prop::collection::vec(1u64..3_000, 1..300),
    ) {
        let mut controller = TrafficPhaseController::new(timings);
        let t0 = Instant::now();
        let mut now = t0;

        prop_assert_eq!(controller.tick(false, now), None);
        prop_assert_eq!(controller.tick(true, now), Some(TrafficPhase::Red));

        let mut phase = TrafficPhase::Red;
        let mut entered = now;

        for step_ms in steps {
            now += Duration::from_millis(step_ms);
            let Some(next) = controller.tick(true, now) else {
                return Err(TestCaseError::fail("controller went idle with presence"));
            };
            if next != phase {
                prop_assert_eq!(next, phase.next());
                prop_assert!(now - entered >= timings.hold(phase));
                phase = next;
                entered = now;
            }
        }
    }

    /// Property: presence never cuts a phase short. Every phase lasts its
    /// hold, and the controller only goes idle when `Amber` ends.
    #[test]
    fn prop_presence_drop_keeps_holds(timings in timings(), steps in tick_steps()) {
        let mut controller = TrafficPhaseController::new(timings);
        let mut now = Instant::now();
        let mut current: Option<(TrafficPhase, Instant)> = None;

        for (step_ms, present) in steps {
            now += Duration::from_millis(step_ms);
            let next = controller.tick(present, now);

            match (current, next) {
                (None, None) => {}
                (None, Some(phase)) => {
                    prop_assert!(present);
                    prop_assert_eq!(phase, TrafficPhase::Red);
                    current = Some((phase, now));
                }
                (Some((phase, entered)), Some(next)) if next == phase => {
                    prop_assert!(now - entered < timings.hold(phase));
                }
                (Some((phase, entered)), Some(next)) => {
                    prop_assert_eq!(next, phase.next());
                    prop_assert!(now - entered >= timings.hold(phase));
                    current = Some((next, now));
                }
                (Some((phase, entered)), None) => {
                    prop_assert_eq!(phase, TrafficPhase::Amber);
                    prop_assert!(!present);
                    prop_assert!(now - entered >= timings.hold(phase));
                    current = None;
                }
            }
        }
    }
}
