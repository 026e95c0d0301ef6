//! Fingerprint enrollment for the gate controller.
//!
//! This crate holds the enrollment state machine, the coordinator that keeps
//! at most one session alive, and slot administration helpers. All of it runs
//! against the non-blocking [`tollgate_hardware::FingerprintSensor`] trait.
//! For mock sensors used in development and testing, see the
//! `tollgate-hardware::mock` module.

pub mod admin;
pub mod enrollment;
pub mod session;

pub use admin::{delete_all, delete_slot, list_slots};
pub use enrollment::{
    EnrollmentConfig, EnrollmentCoordinator, EnrollmentOutcome, EnrollmentTick,
};
pub use session::{EnrollStage, EnrollmentSession, FailureReason, StageTransition};
