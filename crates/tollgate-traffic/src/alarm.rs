//! Pedestrian alarm.
//!
//! The buzzer sounds while vehicles are held at red and someone is standing
//! on the pedestrian side. It is a square wave advanced by the tick, so it
//! never delays the light cycle.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use tollgate_core::constants::DEFAULT_ALARM_TOGGLE_MS;

use crate::phase::TrafficPhase;

/// Whether the alarm condition holds.
pub fn should_sound(phase: TrafficPhase, pedestrian_present: bool) -> bool {
    phase == TrafficPhase::Red && pedestrian_present
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    /// Length of each on and off half of the square wave.
    pub toggle_ms: u64,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            toggle_ms: DEFAULT_ALARM_TOGGLE_MS,
        }
    }
}

impl AlarmConfig {
    pub fn toggle(&self) -> Duration {
        Duration::from_millis(self.toggle_ms)
    }
}

/// Drives the buzzer line from the alarm condition.
#[derive(Debug, Clone)]
pub struct AlarmController {
    toggle: Duration,
    sounding_since: Option<Instant>,
}

impl AlarmController {
    pub fn new(config: AlarmConfig) -> Self {
        Self {
            toggle: config.toggle(),
            sounding_since: None,
        }
    }

    /// Whether the alarm condition currently holds.
    pub fn is_armed(&self) -> bool {
        self.sounding_since.is_some()
    }

    /// Buzzer line state for this tick.
    ///
    /// The wave starts in its "on" half on the first tick the condition
    /// holds and resets as soon as it clears.
    pub fn tick(
        &mut self,
        phase: Option<TrafficPhase>,
        pedestrian_present: bool,
        now: Instant,
    ) -> bool {
        let armed = phase.is_some_and(|p| should_sound(p, pedestrian_present));

        if !armed {
            if self.sounding_since.take().is_some() {
                debug!("Alarm cleared");
            }
            return false;
        }

        let since = *self.sounding_since.get_or_insert_with(|| {
            debug!("Alarm armed: pedestrian present at red");
            now
        });

        if self.toggle.is_zero() {
            return true;
        }

        let halves = now.saturating_duration_since(since).as_millis() / self.toggle.as_millis();
        halves % 2 == 0
    }
}

impl Default for AlarmController {
    fn default() -> Self {
        Self::new(AlarmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[rstest]
    #[case(TrafficPhase::Red, true, true)]
    #[case(TrafficPhase::Red, false, false)]
    #[case(TrafficPhase::RedAmber, true, false)]
    #[case(TrafficPhase::Green, true, false)]
    #[case(TrafficPhase::Amber, true, false)]
    fn test_should_sound(
        #[case] phase: TrafficPhase,
        #[case] pedestrian: bool,
        #[case] expected: bool,
    ) {
        assert_eq!(should_sound(phase, pedestrian), expected);
    }

    #[test]
    fn test_square_wave() {
        let mut alarm = AlarmController::default();
        let t0 = Instant::now();
        let red = Some(TrafficPhase::Red);

        assert!(alarm.tick(red, true, t0));
        assert!(alarm.tick(red, true, t0 + ms(400)));
        assert!(!alarm.tick(red, true, t0 + ms(500)));
        assert!(!alarm.tick(red, true, t0 + ms(900)));
        assert!(alarm.tick(red, true, t0 + ms(1_000)));
        assert!(!alarm.tick(red, true, t0 + ms(1_500)));
    }

    #[test]
    fn test_silent_while_idle() {
        let mut alarm = AlarmController::default();
        assert!(!alarm.tick(None, true, Instant::now()));
        assert!(!alarm.is_armed());
    }

    #[test]
    fn test_clears_and_restarts_in_on_half() {
        let mut alarm = AlarmController::default();
        let t0 = Instant::now();
        let red = Some(TrafficPhase::Red);

        alarm.tick(red, true, t0);
        assert!(!alarm.tick(red, true, t0 + ms(600)));

        assert!(!alarm.tick(red, false, t0 + ms(700)));
        assert!(!alarm.is_armed());

        assert!(alarm.tick(red, true, t0 + ms(800)));
    }

    #[test]
    fn test_stops_when_phase_leaves_red() {
        let mut alarm = AlarmController::default();
        let t0 = Instant::now();

        assert!(alarm.tick(Some(TrafficPhase::Red), true, t0));
        assert!(!alarm.tick(Some(TrafficPhase::RedAmber), true, t0 + ms(100)));
    }
}
