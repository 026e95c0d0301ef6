//! Slot administration on the fingerprint sensor.

use tracing::{debug, info};

use tollgate_core::SlotId;
use tollgate_hardware::{FingerprintSensor, ModelPresence, Result};

/// Slots that currently hold a model, in ascending order.
///
/// # Errors
///
/// Returns the first sensor error encountered.
pub fn list_slots<S>(sensor: &mut S) -> Result<Vec<SlotId>>
where
    S: FingerprintSensor + ?Sized,
{
    let mut occupied = Vec::new();
    for slot in SlotId::all() {
        if sensor.load_model(slot)? == ModelPresence::Exists {
            occupied.push(slot);
        }
    }
    debug!(count = occupied.len(), "Listed occupied slots");
    Ok(occupied)
}

/// Delete the model in `slot`. Deleting an empty slot succeeds.
///
/// # Errors
///
/// Returns the sensor error if the delete fails.
pub fn delete_slot<S>(sensor: &mut S, slot: SlotId) -> Result<()>
where
    S: FingerprintSensor + ?Sized,
{
    sensor.delete_model(slot)?;
    info!(slot = %slot, "Deleted fingerprint");
    Ok(())
}

/// Delete every occupied slot and return which slots were cleared.
///
/// # Errors
///
/// Stops at the first sensor error; slots deleted before it stay deleted.
pub fn delete_all<S>(sensor: &mut S) -> Result<Vec<SlotId>>
where
    S: FingerprintSensor + ?Sized,
{
    let occupied = list_slots(sensor)?;
    for slot in &occupied {
        sensor.delete_model(*slot)?;
    }
    info!(count = occupied.len(), "Deleted all fingerprints");
    Ok(occupied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_hardware::mock::MockFingerprint;

    fn slot(id: i64) -> SlotId {
        SlotId::new(id).unwrap()
    }

    #[test]
    fn test_list_slots_sorted() {
        let (mut sensor, _) = MockFingerprint::new();
        sensor.preload(slot(90), vec![1]);
        sensor.preload(slot(2), vec![2]);
        sensor.preload(slot(127), vec![3]);

        assert_eq!(
            list_slots(&mut sensor).unwrap(),
            vec![slot(2), slot(90), slot(127)]
        );
    }

    #[test]
    fn test_delete_slot() {
        let (mut sensor, _) = MockFingerprint::new();
        sensor.preload(slot(5), vec![1]);

        delete_slot(&mut sensor, slot(5)).unwrap();
        assert!(list_slots(&mut sensor).unwrap().is_empty());
        delete_slot(&mut sensor, slot(5)).unwrap();
    }

    #[test]
    fn test_delete_all() {
        let (mut sensor, _) = MockFingerprint::new();
        sensor.preload(slot(1), vec![1]);
        sensor.preload(slot(3), vec![1]);

        let cleared = delete_all(&mut sensor).unwrap();
        assert_eq!(cleared, vec![slot(1), slot(3)]);
        assert_eq!(sensor.template_count(), 0);
    }

    #[test]
    fn test_disconnected_sensor_errors() {
        let (mut sensor, handle) = MockFingerprint::new();
        handle.set_connected(false).unwrap();
        assert!(list_slots(&mut sensor).is_err());
    }
}
