//! Single-session enrollment coordinator.
//!
//! Holds the only enrollment session in the system. Starting a session while
//! one is active is rejected, never queued. A session that reaches a terminal
//! stage is torn down on the same tick, so a new one may start right away.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tollgate_core::constants::DEFAULT_STAGE_TIMEOUT_MS;
use tollgate_core::{Error, Notice, Result, SlotId};
use tollgate_hardware::FingerprintSensor;

use crate::session::{EnrollStage, EnrollmentSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentConfig {
    /// How long any waiting stage may last.
    pub stage_timeout_ms: u64,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            stage_timeout_ms: DEFAULT_STAGE_TIMEOUT_MS,
        }
    }
}

impl EnrollmentConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }
}

/// Final stage of a session that ended during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentOutcome {
    pub slot: SlotId,
    pub stage: EnrollStage,
}

/// Result of advancing the coordinator by one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrollmentTick {
    pub notice: Option<Notice>,

    /// Set when the session ended (and was torn down) on this tick.
    pub finished: Option<EnrollmentOutcome>,
}

/// Owns the single active enrollment session, if any.
#[derive(Debug, Default)]
pub struct EnrollmentCoordinator {
    config: EnrollmentConfig,
    active: Option<EnrollmentSession>,
}

impl EnrollmentCoordinator {
    pub fn new(config: EnrollmentConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Whether a session is in progress.
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&EnrollmentSession> {
        self.active.as_ref()
    }

    /// Start enrolling `slot`.
    ///
    /// Returns the opening prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingEnrollment`] if a session is already
    /// active. The active session is left untouched.
    pub fn start(&mut self, slot: SlotId, now: Instant) -> Result<Notice> {
        if let Some(active) = &self.active {
            debug!(requested = %slot, active = %active.target_slot(), "Enrollment rejected");
            return Err(Error::ConflictingEnrollment {
                active: active.target_slot(),
            });
        }

        let (session, notice) = EnrollmentSession::start(slot, self.config.stage_timeout(), now);
        info!(slot = %slot, "Enrollment started");
        self.active = Some(session);
        Ok(notice)
    }

    /// Advance the active session, if any, by one tick.
    pub fn tick<S>(&mut self, sensor: &mut S, now: Instant) -> EnrollmentTick
    where
        S: FingerprintSensor + ?Sized,
    {
        let Some(session) = self.active.as_mut() else {
            return EnrollmentTick::default();
        };

        let notice = session.tick(sensor, now);
        let stage = session.stage();
        let slot = session.target_slot();

        let finished = if stage.is_terminal() {
            self.active = None;
            info!(slot = %slot, stage = %stage, "Enrollment session closed");
            Some(EnrollmentOutcome { slot, stage })
        } else {
            None
        };

        EnrollmentTick { notice, finished }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::EventKind;
    use tollgate_hardware::mock::MockFingerprint;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn slot(id: i64) -> SlotId {
        SlotId::new(id).unwrap()
    }

    #[test]
    fn test_start_returns_prompt() {
        let mut coordinator = EnrollmentCoordinator::default();
        let notice = coordinator.start(slot(4), Instant::now()).unwrap();

        assert_eq!(notice.kind, EventKind::Prompt);
        assert!(coordinator.is_busy());
        assert_eq!(coordinator.active().unwrap().target_slot(), slot(4));
    }

    #[test]
    fn test_conflict_leaves_active_session_untouched() {
        let mut coordinator = EnrollmentCoordinator::default();
        let t0 = Instant::now();
        coordinator.start(slot(4), t0).unwrap();
        let before = coordinator.active().unwrap().stage_entered_at();

        let result = coordinator.start(slot(9), t0 + ms(500));
        assert!(matches!(
            result,
            Err(Error::ConflictingEnrollment { active }) if active == slot(4)
        ));

        let active = coordinator.active().unwrap();
        assert_eq!(active.target_slot(), slot(4));
        assert_eq!(active.stage(), EnrollStage::AwaitFirstImage);
        assert_eq!(active.stage_entered_at(), before);
    }

    #[test]
    fn test_timeout_releases_lock_same_tick() {
        let (mut sensor, _finger) = MockFingerprint::new();
        let mut coordinator = EnrollmentCoordinator::default();
        let t0 = Instant::now();
        coordinator.start(slot(1), t0).unwrap();

        let tick = coordinator.tick(&mut sensor, t0 + ms(10_000));
        assert_eq!(tick.notice.unwrap().kind, EventKind::Error);
        assert_eq!(tick.finished.unwrap().slot, slot(1));
        assert!(!coordinator.is_busy());

        assert!(coordinator.start(slot(2), t0 + ms(10_000)).is_ok());
    }

    #[test]
    fn test_completion_releases_lock() {
        let (mut sensor, finger) = MockFingerprint::new();
        let mut coordinator = EnrollmentCoordinator::default();
        let t0 = Instant::now();
        coordinator.start(slot(8), t0).unwrap();

        finger.place_finger(vec![7, 7], 90).unwrap();
        coordinator.tick(&mut sensor, t0 + ms(100));
        finger.lift_finger().unwrap();
        coordinator.tick(&mut sensor, t0 + ms(200));
        finger.place_finger(vec![7, 7], 90).unwrap();
        let tick = coordinator.tick(&mut sensor, t0 + ms(300));

        assert_eq!(tick.notice.unwrap().kind, EventKind::Done);
        assert_eq!(tick.finished.unwrap().stage, EnrollStage::Completed);
        assert!(!coordinator.is_busy());
    }

    #[test]
    fn test_idle_tick_does_nothing() {
        let (mut sensor, _finger) = MockFingerprint::new();
        let mut coordinator = EnrollmentCoordinator::default();
        assert_eq!(
            coordinator.tick(&mut sensor, Instant::now()),
            EnrollmentTick::default()
        );
    }

    #[test]
    fn test_custom_timeout() {
        let (mut sensor, _finger) = MockFingerprint::new();
        let mut coordinator = EnrollmentCoordinator::new(EnrollmentConfig {
            stage_timeout_ms: 1_000,
        });
        let t0 = Instant::now();
        coordinator.start(slot(1), t0).unwrap();

        assert!(coordinator.tick(&mut sensor, t0 + ms(999)).notice.is_none());
        assert!(coordinator.tick(&mut sensor, t0 + ms(1_000)).finished.is_some());
    }
}
