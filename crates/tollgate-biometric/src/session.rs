//! Fingerprint enrollment state machine.
//!
//! One session drives the sensor through a two-touch enrollment for a target
//! slot. It is advanced once per tick and never blocks waiting for a finger:
//! a stage that is still waiting simply stays where it is.
//!
//! # Stages
//!
//! - `Idle`: created, not started
//! - `AwaitFirstImage`: waiting for the first touch
//! - `AwaitFingerRemoval`: first template made, waiting for the finger to lift
//! - `AwaitSecondImage`: waiting for the second touch
//! - `Completed`: model stored in the slot
//! - `Failed(reason)`: enrollment abandoned
//!
//! # Valid Transitions
//!
//! - Idle → AwaitFirstImage → AwaitFingerRemoval → AwaitSecondImage → Completed
//! - Any waiting stage → Failed
//!
//! Every transition produces exactly one [`Notice`].

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use tollgate_core::{Error, Notice, SlotId};
use tollgate_hardware::{FingerprintSensor, ImageStatus, ModelMatch, TemplateBuffer};

/// Why an enrollment ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// A waiting stage exceeded the stage timeout.
    Timeout,

    /// An image could not be converted to a template.
    LowQuality,

    /// The sensor reported an error while imaging.
    SensorError,

    /// The two templates do not come from one finger.
    Mismatch,

    /// Model creation failed for another reason.
    ModelError,

    /// The model could not be written to the slot.
    StorageError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Timeout => "timeout",
            FailureReason::LowQuality => "low_quality",
            FailureReason::SensorError => "sensor_error",
            FailureReason::Mismatch => "mismatch",
            FailureReason::ModelError => "model_error",
            FailureReason::StorageError => "storage_error",
        }
    }

    /// The error this failure represents for `slot`.
    pub fn to_error(&self, slot: SlotId) -> Error {
        match self {
            FailureReason::Timeout => Error::EnrollmentTimeout { slot },
            FailureReason::LowQuality => Error::EnrollmentLowQuality { slot },
            FailureReason::SensorError => Error::EnrollmentSensorError { slot },
            FailureReason::Mismatch => Error::EnrollmentMismatch { slot },
            FailureReason::ModelError => Error::ModelError { slot },
            FailureReason::StorageError => Error::StorageFailure { slot },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of an enrollment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollStage {
    Idle,
    AwaitFirstImage,
    AwaitFingerRemoval,
    AwaitSecondImage,
    Completed,
    Failed(FailureReason),
}

impl fmt::Display for EnrollStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnrollStage::Idle => write!(f, "Idle"),
            EnrollStage::AwaitFirstImage => write!(f, "AwaitFirstImage"),
            EnrollStage::AwaitFingerRemoval => write!(f, "AwaitFingerRemoval"),
            EnrollStage::AwaitSecondImage => write!(f, "AwaitSecondImage"),
            EnrollStage::Completed => write!(f, "Completed"),
            EnrollStage::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

impl EnrollStage {
    /// Check if transition to target stage is valid from this stage.
    ///
    /// # Examples
    ///
    /// ```
    /// use tollgate_biometric::{EnrollStage, FailureReason};
    ///
    /// assert!(EnrollStage::Idle.can_transition_to(&EnrollStage::AwaitFirstImage));
    /// assert!(EnrollStage::AwaitSecondImage
    ///     .can_transition_to(&EnrollStage::Failed(FailureReason::Mismatch)));
    /// assert!(!EnrollStage::AwaitFirstImage.can_transition_to(&EnrollStage::Completed));
    /// ```
    pub fn can_transition_to(&self, target: &EnrollStage) -> bool {
        matches!(
            (self, target),
            (EnrollStage::Idle, EnrollStage::AwaitFirstImage)
                | (EnrollStage::AwaitFirstImage, EnrollStage::AwaitFingerRemoval)
                | (EnrollStage::AwaitFingerRemoval, EnrollStage::AwaitSecondImage)
                | (EnrollStage::AwaitSecondImage, EnrollStage::Completed)
                | (
                    EnrollStage::AwaitFirstImage
                        | EnrollStage::AwaitFingerRemoval
                        | EnrollStage::AwaitSecondImage,
                    EnrollStage::Failed(_)
                )
        )
    }

    /// Whether the session is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnrollStage::Completed | EnrollStage::Failed(_))
    }

    /// Whether the stage is polling the sensor and subject to the timeout.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            EnrollStage::AwaitFirstImage
                | EnrollStage::AwaitFingerRemoval
                | EnrollStage::AwaitSecondImage
        )
    }
}

/// A recorded stage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransition {
    pub from: EnrollStage,
    pub to: EnrollStage,
    pub at: Instant,
}

/// One enrollment of one slot.
#[derive(Debug, Clone)]
pub struct EnrollmentSession {
    target_slot: SlotId,
    stage: EnrollStage,
    stage_entered_at: Instant,
    stage_timeout: Duration,
    transitions: Vec<StageTransition>,
}

impl EnrollmentSession {
    /// Create a session in `Idle`.
    pub fn new(target_slot: SlotId, stage_timeout: Duration, now: Instant) -> Self {
        Self {
            target_slot,
            stage: EnrollStage::Idle,
            stage_entered_at: now,
            stage_timeout,
            transitions: Vec::with_capacity(4),
        }
    }

    pub fn target_slot(&self) -> SlotId {
        self.target_slot
    }

    pub fn stage(&self) -> EnrollStage {
        self.stage
    }

    pub fn stage_entered_at(&self) -> Instant {
        self.stage_entered_at
    }

    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    /// Create a session and move it straight to `AwaitFirstImage`.
    ///
    /// Returns the session with its opening prompt.
    pub fn start(target_slot: SlotId, stage_timeout: Duration, now: Instant) -> (Self, Notice) {
        let mut session = Self::new(target_slot, stage_timeout, now);
        session.enter(EnrollStage::AwaitFirstImage, now);
        let notice = session.first_prompt();
        (session, notice)
    }

    /// Enter `AwaitFirstImage` and prompt for the first touch.
    ///
    /// Does nothing unless the session is `Idle`.
    pub fn begin(&mut self, now: Instant) -> Option<Notice> {
        if self.stage != EnrollStage::Idle {
            return None;
        }
        self.enter(EnrollStage::AwaitFirstImage, now);
        Some(self.first_prompt())
    }

    fn first_prompt(&self) -> Notice {
        Notice::prompt(format!(
            "Place finger on sensor (1/2) for ID {}",
            self.target_slot
        ))
    }

    /// Advance by at most one stage.
    ///
    /// Returns the notice for the transition taken, if any.
    pub fn tick<S>(&mut self, sensor: &mut S, now: Instant) -> Option<Notice>
    where
        S: FingerprintSensor + ?Sized,
    {
        match self.stage {
            EnrollStage::AwaitFirstImage => self.poll_first_image(sensor, now),
            EnrollStage::AwaitFingerRemoval => self.poll_finger_removal(sensor, now),
            EnrollStage::AwaitSecondImage => self.poll_second_image(sensor, now),
            EnrollStage::Idle | EnrollStage::Completed | EnrollStage::Failed(_) => None,
        }
    }

    fn poll_first_image<S>(&mut self, sensor: &mut S, now: Instant) -> Option<Notice>
    where
        S: FingerprintSensor + ?Sized,
    {
        match sensor.get_image() {
            Ok(ImageStatus::Captured) => match sensor.convert(TemplateBuffer::First) {
                Ok(()) => {
                    self.enter(EnrollStage::AwaitFingerRemoval, now);
                    Some(Notice::status("Template 1 created. Remove finger"))
                }
                Err(e) => self.fail(FailureReason::LowQuality, &e, now),
            },
            Ok(ImageStatus::NoFinger) => self.check_timeout(now),
            Err(e) => self.fail(FailureReason::SensorError, &e, now),
        }
    }

    fn poll_finger_removal<S>(&mut self, sensor: &mut S, now: Instant) -> Option<Notice>
    where
        S: FingerprintSensor + ?Sized,
    {
        match sensor.get_image() {
            Ok(ImageStatus::NoFinger) => {
                self.enter(EnrollStage::AwaitSecondImage, now);
                Some(Notice::prompt("Place same finger again (2/2)"))
            }
            Ok(ImageStatus::Captured) => self.check_timeout(now),
            Err(e) => self.fail(FailureReason::SensorError, &e, now),
        }
    }

    fn poll_second_image<S>(&mut self, sensor: &mut S, now: Instant) -> Option<Notice>
    where
        S: FingerprintSensor + ?Sized,
    {
        match sensor.get_image() {
            Ok(ImageStatus::Captured) => {}
            Ok(ImageStatus::NoFinger) => return self.check_timeout(now),
            Err(e) => return self.fail(FailureReason::SensorError, &e, now),
        }

        if let Err(e) = sensor.convert(TemplateBuffer::Second) {
            return self.fail(FailureReason::LowQuality, &e, now);
        }

        match sensor.create_model() {
            Ok(ModelMatch::Created) => {}
            Ok(ModelMatch::Mismatch) => {
                return self.fail(FailureReason::Mismatch, &"templates differ", now);
            }
            Err(e) => return self.fail(FailureReason::ModelError, &e, now),
        }

        match sensor.store_model(self.target_slot) {
            Ok(()) => {
                self.enter(EnrollStage::Completed, now);
                Some(Notice::done(format!(
                    "Stored fingerprint as ID {}",
                    self.target_slot
                )))
            }
            Err(e) => self.fail(FailureReason::StorageError, &e, now),
        }
    }

    fn check_timeout(&mut self, now: Instant) -> Option<Notice> {
        if now.saturating_duration_since(self.stage_entered_at) >= self.stage_timeout {
            self.fail(FailureReason::Timeout, &"no finger activity", now)
        } else {
            None
        }
    }

    fn fail(
        &mut self,
        reason: FailureReason,
        cause: &dyn fmt::Display,
        now: Instant,
    ) -> Option<Notice> {
        let error = reason.to_error(self.target_slot);
        warn!(slot = %self.target_slot, stage = %self.stage, %cause, "{error}");
        self.enter(EnrollStage::Failed(reason), now);
        Some(Notice::error(format!(
            "Enrollment failed for ID {}: {reason}",
            self.target_slot
        )))
    }

    fn enter(&mut self, stage: EnrollStage, now: Instant) {
        debug_assert!(self.stage.can_transition_to(&stage));
        info!(
            slot = %self.target_slot,
            from = %self.stage,
            to = %stage,
            "Enrollment stage changed"
        );
        self.transitions.push(StageTransition {
            from: self.stage,
            to: stage,
            at: now,
        });
        self.stage = stage;
        self.stage_entered_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tollgate_core::EventKind;
    use tollgate_hardware::mock::MockFingerprint;

    const TIMEOUT: Duration = Duration::from_millis(10_000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn slot(id: i64) -> SlotId {
        SlotId::new(id).unwrap()
    }

    fn started(id: i64, now: Instant) -> (EnrollmentSession, Notice) {
        EnrollmentSession::start(slot(id), TIMEOUT, now)
    }

    #[test]
    fn test_begin_prompts_for_first_touch() {
        let t0 = Instant::now();
        let (session, notice) = started(5, t0);

        assert_eq!(session.stage(), EnrollStage::AwaitFirstImage);
        assert_eq!(notice.kind, EventKind::Prompt);
        assert_eq!(notice.message, "Place finger on sensor (1/2) for ID 5");
    }

    #[test]
    fn test_begin_from_idle() {
        let t0 = Instant::now();
        let mut session = EnrollmentSession::new(slot(5), TIMEOUT, t0);
        assert_eq!(session.stage(), EnrollStage::Idle);

        assert!(session.begin(t0).is_some());
        assert_eq!(session.stage(), EnrollStage::AwaitFirstImage);
        assert!(session.begin(t0).is_none());
    }

    #[test]
    fn test_happy_path() {
        let (mut sensor, finger) = MockFingerprint::new();
        let t0 = Instant::now();
        let (mut session, _) = started(3, t0);

        // Nothing on the sensor yet
        assert!(session.tick(&mut sensor, t0 + ms(100)).is_none());

        finger.place_finger(vec![1, 2, 3], 80).unwrap();
        let notice = session.tick(&mut sensor, t0 + ms(200)).unwrap();
        assert_eq!(notice.kind, EventKind::Status);
        assert_eq!(notice.message, "Template 1 created. Remove finger");
        assert_eq!(session.stage(), EnrollStage::AwaitFingerRemoval);

        // Still on the sensor
        assert!(session.tick(&mut sensor, t0 + ms(300)).is_none());

        finger.lift_finger().unwrap();
        let notice = session.tick(&mut sensor, t0 + ms(400)).unwrap();
        assert_eq!(notice.kind, EventKind::Prompt);
        assert_eq!(notice.message, "Place same finger again (2/2)");

        finger.place_finger(vec![1, 2, 3], 80).unwrap();
        let notice = session.tick(&mut sensor, t0 + ms(500)).unwrap();
        assert_eq!(notice.kind, EventKind::Done);
        assert_eq!(notice.message, "Stored fingerprint as ID 3");
        assert_eq!(session.stage(), EnrollStage::Completed);
        assert_eq!(sensor.template(slot(3)), Some(&vec![1, 2, 3]));
        assert_eq!(session.transitions().len(), 4);
    }

    #[test]
    fn test_first_image_timeout() {
        let (mut sensor, _finger) = MockFingerprint::new();
        let t0 = Instant::now();
        let (mut session, _) = started(1, t0);

        assert!(session.tick(&mut sensor, t0 + ms(9_999)).is_none());
        let notice = session.tick(&mut sensor, t0 + ms(10_000)).unwrap();
        assert_eq!(notice.kind, EventKind::Error);
        assert!(notice.message.ends_with("timeout"));
        assert_eq!(session.stage(), EnrollStage::Failed(FailureReason::Timeout));
    }

    #[test]
    fn test_finger_never_lifted_times_out() {
        let (mut sensor, finger) = MockFingerprint::new();
        let t0 = Instant::now();
        let (mut session, _) = started(1, t0);

        finger.place_finger(vec![4, 4], 80).unwrap();
        session.tick(&mut sensor, t0 + ms(100));
        assert!(session.tick(&mut sensor, t0 + ms(10_099)).is_none());
        session.tick(&mut sensor, t0 + ms(10_100));
        assert_eq!(session.stage(), EnrollStage::Failed(FailureReason::Timeout));
    }

    #[test]
    fn test_low_quality() {
        let (mut sensor, finger) = MockFingerprint::new();
        let t0 = Instant::now();
        let (mut session, _) = started(1, t0);

        finger.place_finger(vec![1], 10).unwrap();
        let notice = session.tick(&mut sensor, t0 + ms(100)).unwrap();
        assert_eq!(notice.message, "Enrollment failed for ID 1: low_quality");
    }

    #[test]
    fn test_sensor_error() {
        let (mut sensor, finger) = MockFingerprint::new();
        let t0 = Instant::now();
        let (mut session, _) = started(1, t0);

        finger.fail_next_image().unwrap();
        session.tick(&mut sensor, t0 + ms(100));
        assert_eq!(
            session.stage(),
            EnrollStage::Failed(FailureReason::SensorError)
        );
    }

    #[rstest]
    #[case::mismatch(vec![9, 9, 9], false, FailureReason::Mismatch)]
    #[case::storage(vec![1, 2, 3], true, FailureReason::StorageError)]
    fn test_second_image_failures(
        #[case] second: Vec<u8>,
        #[case] fail_store: bool,
        #[case] expected: FailureReason,
    ) {
        let (mut sensor, finger) = MockFingerprint::new();
        let t0 = Instant::now();
        let (mut session, _) = started(2, t0);

        finger.place_finger(vec![1, 2, 3], 80).unwrap();
        session.tick(&mut sensor, t0 + ms(100));
        finger.lift_finger().unwrap();
        session.tick(&mut sensor, t0 + ms(200));

        if fail_store {
            finger.fail_next_store().unwrap();
        }
        finger.place_finger(second, 80).unwrap();
        let notice = session.tick(&mut sensor, t0 + ms(300)).unwrap();

        assert_eq!(notice.kind, EventKind::Error);
        assert_eq!(session.stage(), EnrollStage::Failed(expected));
        assert_eq!(sensor.template_count(), 0);
    }

    #[test]
    fn test_terminal_session_stays_put() {
        let (mut sensor, _finger) = MockFingerprint::new();
        let t0 = Instant::now();
        let (mut session, _) = started(1, t0);

        session.tick(&mut sensor, t0 + ms(10_000));
        assert!(session.stage().is_terminal());
        assert!(session.tick(&mut sensor, t0 + ms(20_000)).is_none());
    }

    #[test]
    fn test_failure_reason_names() {
        assert_eq!(FailureReason::LowQuality.as_str(), "low_quality");
        assert_eq!(FailureReason::StorageError.to_string(), "storage_error");
    }
}
