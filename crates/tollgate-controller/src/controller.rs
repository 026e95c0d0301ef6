//! The per-tick gate controller.
//!
//! One [`GateController::tick`] advances every pipeline exactly once:
//!
//! ```text
//! range sensors ──► presence ──► phase ──► alarm ──► signal head
//! tag reader ──► frame decoder ──► dedup ──► rfid events, pass log
//! fingerprint sensor ──► enrollment session ──► prompt/status/error/done
//! ```
//!
//! The pipelines share only the tick instant and the event sink. Nothing in a
//! tick returns an error: hardware faults are logged and degrade to "no
//! presence", "no frame" or a failed enrollment.

use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use tollgate_biometric::{EnrollmentCoordinator, delete_all, delete_slot, list_slots};
use tollgate_core::{DistanceReading, Error, EventSink, Notice, SlotId};
use tollgate_hardware::{FingerprintSensor, TagByteSource};
use tollgate_rfid::{RfidStats, TagPipeline};
use tollgate_storage::{MetadataRepository, MetadataStore, SlotOwner};
use tollgate_traffic::{
    AlarmController, DistanceSensor, PresenceFilter, SignalOutput, SignalOutputs, TrafficPhase,
    TrafficPhaseController,
};

use crate::commands::{Command, CommandError, CommandReply, SlotEntry, parse_slot};
use crate::config::GateConfig;

/// Everything the controller drives or reads.
pub struct Peripherals {
    /// Sensors watching the vehicle lane. Presence is the OR of all of them.
    pub vehicle_sensors: Vec<Box<dyn DistanceSensor>>,

    /// Sensors watching the pedestrian crossing.
    pub pedestrian_sensors: Vec<Box<dyn DistanceSensor>>,

    pub signals: Box<dyn SignalOutput>,
    pub tag_reader: Box<dyn TagByteSource>,
    pub fingerprint: Box<dyn FingerprintSensor>,
}

impl std::fmt::Debug for Peripherals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peripherals")
            .field("vehicle_sensors", &self.vehicle_sensors.len())
            .field("pedestrian_sensors", &self.pedestrian_sensors.len())
            .finish_non_exhaustive()
    }
}

/// What one tick observed and decided.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSummary {
    pub vehicle_present: bool,
    pub pedestrian_present: bool,
    pub phase: Option<TrafficPhase>,
    pub outputs: SignalOutputs,
    pub passes: usize,
}

/// Owns all gate state and advances it one tick at a time.
pub struct GateController {
    started_at: Instant,
    peripherals: Peripherals,
    presence: PresenceFilter,
    phases: TrafficPhaseController,
    alarm: AlarmController,
    tags: TagPipeline,
    enrollment: EnrollmentCoordinator,
    metadata: MetadataRepository<Box<dyn MetadataStore>>,
    sink: Box<dyn EventSink>,
    stats_interval: Option<Duration>,
    last_stats_at: Instant,
    tag_buf: Vec<u8>,
    tag_reader_down: bool,
}

impl GateController {
    /// Build a controller from a validated configuration.
    ///
    /// `now` is the instant event timestamps count from.
    pub fn new(
        config: &GateConfig,
        peripherals: Peripherals,
        store: Box<dyn MetadataStore>,
        sink: Box<dyn EventSink>,
        now: Instant,
    ) -> Self {
        info!(
            vehicle_sensors = peripherals.vehicle_sensors.len(),
            pedestrian_sensors = peripherals.pedestrian_sensors.len(),
            "Gate controller ready"
        );

        Self {
            started_at: now,
            peripherals,
            presence: PresenceFilter::new(config.presence),
            phases: TrafficPhaseController::new(config.traffic),
            alarm: AlarmController::new(config.alarm),
            tags: TagPipeline::new(config.rfid.decoder(), config.rfid.dedup()),
            enrollment: EnrollmentCoordinator::new(config.enrollment),
            metadata: MetadataRepository::new(store),
            sink,
            stats_interval: config.runtime.stats_interval(),
            last_stats_at: now,
            tag_buf: Vec::with_capacity(64),
            tag_reader_down: false,
        }
    }

    pub fn current_phase(&self) -> Option<TrafficPhase> {
        self.phases.current_phase()
    }

    pub fn is_enrolling(&self) -> bool {
        self.enrollment.is_busy()
    }

    pub fn rfid_stats(&self) -> RfidStats {
        self.tags.stats()
    }

    pub fn metadata(&self) -> &MetadataRepository<Box<dyn MetadataStore>> {
        &self.metadata
    }

    /// Milliseconds since the controller started.
    pub fn uptime_ms(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at).as_millis() as u64
    }

    /// Advance every pipeline once.
    pub fn tick(&mut self, now: Instant) -> TickSummary {
        let (vehicle_present, pedestrian_present, phase, outputs) = self.tick_traffic(now);
        let passes = self.tick_rfid(now);
        self.tick_enrollment(now);
        self.maybe_log_stats(now);

        TickSummary {
            vehicle_present,
            pedestrian_present,
            phase,
            outputs,
            passes,
        }
    }

    fn tick_traffic(&mut self, now: Instant) -> (bool, bool, Option<TrafficPhase>, SignalOutputs) {
        let vehicle: Vec<DistanceReading> = self
            .peripherals
            .vehicle_sensors
            .iter_mut()
            .map(|sensor| sensor.measure(now))
            .collect();
        let pedestrian: Vec<DistanceReading> = self
            .peripherals
            .pedestrian_sensors
            .iter_mut()
            .map(|sensor| sensor.measure(now))
            .collect();

        let vehicle_present = self.presence.is_present(&vehicle);
        let pedestrian_present = self.presence.is_present(&pedestrian);

        let phase = self.phases.tick(vehicle_present, now);
        let buzzer = self.alarm.tick(phase, pedestrian_present, now);
        let outputs = SignalOutputs::for_phase(phase, buzzer);
        self.peripherals.signals.apply(&outputs);

        (vehicle_present, pedestrian_present, phase, outputs)
    }

    fn tick_rfid(&mut self, now: Instant) -> usize {
        self.tag_buf.clear();
        match self.peripherals.tag_reader.read_available(&mut self.tag_buf) {
            Ok(_) => {
                if self.tag_reader_down {
                    info!("Tag reader recovered");
                    self.tag_reader_down = false;
                }
            }
            Err(e) => {
                if !self.tag_reader_down {
                    warn!(error = %e, "Tag reader unavailable");
                    self.tag_reader_down = true;
                }
            }
        }

        // Runs even without new bytes so that quiet gaps complete frames
        let passes = self.tags.process(&self.tag_buf, now);
        for pass in &passes {
            self.emit(Notice::rfid(pass.tag.as_str()), now);
            if let Err(e) = self.metadata.record_pass(&pass.tag, Utc::now()) {
                warn!(tag = %pass.tag, error = %e, "Could not log vehicle pass");
            }
        }
        passes.len()
    }

    fn tick_enrollment(&mut self, now: Instant) {
        let tick = self
            .enrollment
            .tick(self.peripherals.fingerprint.as_mut(), now);
        if let Some(notice) = tick.notice {
            self.emit(notice, now);
        }
        if let Some(outcome) = tick.finished {
            debug!(slot = %outcome.slot, stage = %outcome.stage, "Enrollment lock released");
        }
    }

    fn maybe_log_stats(&mut self, now: Instant) {
        let Some(interval) = self.stats_interval else {
            return;
        };
        if now.saturating_duration_since(self.last_stats_at) >= interval {
            self.last_stats_at = now;
            self.tags.log_stats(self.uptime_ms(now) / 1_000);
        }
    }

    fn emit(&mut self, notice: Notice, now: Instant) {
        let event = notice.stamp(self.uptime_ms(now));
        self.sink.publish(event);
    }

    /// Run one command between ticks.
    ///
    /// # Errors
    ///
    /// See [`CommandError`]. Sensor commands are refused with
    /// [`CommandError::Conflict`] while an enrollment holds the sensor.
    pub fn execute(
        &mut self,
        command: Command,
        now: Instant,
    ) -> Result<CommandReply, CommandError> {
        if command.uses_sensor() {
            if let Some(active) = self.enrollment.active() {
                let active = active.target_slot();
                debug!(?command, active = %active, "Command refused during enrollment");
                return Err(CommandError::Conflict { active });
            }
        }

        match command {
            Command::StartEnrollment { slot } => self.start_enrollment(parse_slot(slot)?, now),
            Command::DeleteSlot { slot } => self.delete_slot(parse_slot(slot)?),
            Command::DeleteAll => self.delete_all(),
            Command::ListSlots => self.list_slots(),
            Command::SaveOwner { slot, owner, role } => {
                self.save_owner(parse_slot(slot)?, &owner, &role)
            }
        }
    }

    fn start_enrollment(
        &mut self,
        slot: SlotId,
        now: Instant,
    ) -> Result<CommandReply, CommandError> {
        let notice = self.enrollment.start(slot, now).map_err(|e| match e {
            Error::ConflictingEnrollment { active } => CommandError::Conflict { active },
            other => CommandError::Enrollment(other),
        })?;
        self.emit(notice, now);
        Ok(CommandReply::EnrollmentStarted { slot })
    }

    fn delete_slot(&mut self, slot: SlotId) -> Result<CommandReply, CommandError> {
        delete_slot(self.peripherals.fingerprint.as_mut(), slot)?;
        self.metadata.remove_owner(slot)?;
        Ok(CommandReply::Deleted { slot })
    }

    fn delete_all(&mut self) -> Result<CommandReply, CommandError> {
        let deleted = delete_all(self.peripherals.fingerprint.as_mut())?;
        let mut orphans = self.metadata.owned_slots();
        orphans.extend(deleted.iter().copied());
        for slot in orphans {
            self.metadata.remove_owner(slot)?;
        }
        Ok(CommandReply::DeletedAll {
            count: deleted.len(),
        })
    }

    fn list_slots(&mut self) -> Result<CommandReply, CommandError> {
        let occupied = list_slots(self.peripherals.fingerprint.as_mut())?;
        let slots = occupied
            .into_iter()
            .map(|slot| {
                let owner = self.metadata.owner(slot).unwrap_or_else(|e| {
                    warn!(slot = %slot, error = %e, "Ignoring unreadable owner record");
                    None
                });
                SlotEntry { slot, owner }
            })
            .collect();
        Ok(CommandReply::Slots { slots })
    }

    fn save_owner(
        &mut self,
        slot: SlotId,
        owner: &str,
        role: &str,
    ) -> Result<CommandReply, CommandError> {
        let record = SlotOwner::new(owner, role, Utc::now())?;
        self.metadata.save_owner(slot, &record)?;
        Ok(CommandReply::OwnerSaved { slot })
    }
}

impl std::fmt::Debug for GateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GateController")
            .field("phase", &self.phases.current_phase())
            .field("enrolling", &self.enrollment.is_busy())
            .field("peripherals", &self.peripherals)
            .finish_non_exhaustive()
    }
}
