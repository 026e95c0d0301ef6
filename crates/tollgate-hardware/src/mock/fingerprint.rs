//! Mock fingerprint sensor implementation for testing and development.
//!
//! This module provides a simulated optical fingerprint sensor that can be
//! controlled programmatically for testing without requiring physical hardware.

use crate::{
    HardwareError, Result,
    traits::FingerprintSensor,
    types::{
        DEFAULT_QUALITY_THRESHOLD, FingerSample, ImageStatus, ModelMatch, ModelPresence,
        TemplateBuffer,
    },
};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tollgate_core::SlotId;

/// Mock fingerprint sensor for testing and development.
///
/// The sensor keeps an image buffer, two template buffers, a model buffer and
/// a slot database, like the real module. What is on the sensor window is
/// controlled through the paired [`MockFingerprintHandle`].
///
/// # Examples
///
/// ```
/// use tollgate_hardware::mock::MockFingerprint;
/// use tollgate_hardware::traits::FingerprintSensor;
/// use tollgate_hardware::types::{ImageStatus, TemplateBuffer};
///
/// let (mut sensor, handle) = MockFingerprint::new();
///
/// assert_eq!(sensor.get_image().unwrap(), ImageStatus::NoFinger);
///
/// handle.place_finger(vec![1, 2, 3, 4, 5], 80).unwrap();
/// assert_eq!(sensor.get_image().unwrap(), ImageStatus::Captured);
/// sensor.convert(TemplateBuffer::First).unwrap();
/// ```
#[derive(Debug)]
pub struct MockFingerprint {
    /// Channel receiver for scripted sensor events
    event_rx: mpsc::UnboundedReceiver<FingerEvent>,

    /// Device name
    name: String,

    /// Finger currently on the window
    finger: Option<FingerSample>,

    /// Last captured image
    image: Option<FingerSample>,

    /// Character buffers 1 and 2
    buffers: [Option<FingerSample>; 2],

    /// Last created model
    model: Option<Vec<u8>>,

    /// Slot database
    templates: HashMap<SlotId, Vec<u8>>,

    /// Minimum quality accepted by `convert`
    quality_threshold: u8,

    fail_next_image: bool,
    fail_next_store: bool,
    disconnected: bool,
}

impl MockFingerprint {
    /// Create a new mock sensor with the default name.
    ///
    /// Returns a tuple of (MockFingerprint, MockFingerprintHandle) where the
    /// handle can be used to place and lift fingers and inject faults.
    pub fn new() -> (Self, MockFingerprintHandle) {
        Self::with_name("Mock Fingerprint Sensor".to_string())
    }

    /// Create a new mock sensor with a custom name.
    pub fn with_name(name: String) -> (Self, MockFingerprintHandle) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let sensor = Self {
            event_rx,
            name: name.clone(),
            finger: None,
            image: None,
            buffers: [None, None],
            model: None,
            templates: HashMap::new(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            fail_next_image: false,
            fail_next_store: false,
            disconnected: false,
        };

        let handle = MockFingerprintHandle { event_tx, name };

        (sensor, handle)
    }

    /// Set the minimum quality accepted by template conversion.
    pub fn with_quality_threshold(mut self, threshold: u8) -> Self {
        self.quality_threshold = threshold;
        self
    }

    /// Store a template directly in a slot, as if enrolled earlier.
    pub fn preload(&mut self, slot: SlotId, template: Vec<u8>) {
        self.templates.insert(slot, template);
    }

    /// Get the number of stored templates.
    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Get the template stored in a slot.
    pub fn template(&self, slot: SlotId) -> Option<&Vec<u8>> {
        self.templates.get(&slot)
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply every scripted event sent since the last call.
    fn drain_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                FingerEvent::Place(sample) => self.finger = Some(sample),
                FingerEvent::Lift => self.finger = None,
                FingerEvent::FailNextImage => self.fail_next_image = true,
                FingerEvent::FailNextStore => self.fail_next_store = true,
                FingerEvent::SetConnected(connected) => self.disconnected = !connected,
            }
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.disconnected {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        Ok(())
    }

    fn buffer_index(buffer: TemplateBuffer) -> usize {
        match buffer {
            TemplateBuffer::First => 0,
            TemplateBuffer::Second => 1,
        }
    }
}

impl Default for MockFingerprint {
    fn default() -> Self {
        Self::new().0
    }
}

impl FingerprintSensor for MockFingerprint {
    fn get_image(&mut self) -> Result<ImageStatus> {
        self.drain_events();
        self.ensure_connected()?;

        if self.fail_next_image {
            self.fail_next_image = false;
            return Err(HardwareError::image_capture("Imaging fail"));
        }

        match &self.finger {
            Some(sample) => {
                self.image = Some(sample.clone());
                Ok(ImageStatus::Captured)
            }
            None => Ok(ImageStatus::NoFinger),
        }
    }

    fn convert(&mut self, buffer: TemplateBuffer) -> Result<()> {
        self.drain_events();
        self.ensure_connected()?;

        let image = self
            .image
            .take()
            .ok_or_else(|| HardwareError::conversion("No image in buffer"))?;

        if !image.is_quality_acceptable_with_threshold(self.quality_threshold) {
            return Err(HardwareError::conversion(format!(
                "Image too messy (quality {})",
                image.quality
            )));
        }

        self.buffers[Self::buffer_index(buffer)] = Some(image);
        Ok(())
    }

    fn create_model(&mut self) -> Result<ModelMatch> {
        self.drain_events();
        self.ensure_connected()?;

        let (Some(first), Some(second)) = (&self.buffers[0], &self.buffers[1]) else {
            return Err(HardwareError::invalid_data("Template buffers not filled"));
        };

        // Byte comparison stands in for the sensor's matcher
        if first.template == second.template {
            self.model = Some(first.template.clone());
            Ok(ModelMatch::Created)
        } else {
            self.model = None;
            Ok(ModelMatch::Mismatch)
        }
    }

    fn store_model(&mut self, slot: SlotId) -> Result<()> {
        self.drain_events();
        self.ensure_connected()?;

        if self.fail_next_store {
            self.fail_next_store = false;
            return Err(HardwareError::flash("Error writing to flash"));
        }

        let model = self
            .model
            .clone()
            .ok_or_else(|| HardwareError::invalid_data("No model to store"))?;
        self.templates.insert(slot, model);
        Ok(())
    }

    fn load_model(&mut self, slot: SlotId) -> Result<ModelPresence> {
        self.drain_events();
        self.ensure_connected()?;

        Ok(if self.templates.contains_key(&slot) {
            ModelPresence::Exists
        } else {
            ModelPresence::Absent
        })
    }

    fn delete_model(&mut self, slot: SlotId) -> Result<()> {
        self.drain_events();
        self.ensure_connected()?;

        self.templates.remove(&slot);
        Ok(())
    }
}

/// Internal event type for the mock sensor.
#[derive(Debug, Clone)]
enum FingerEvent {
    Place(FingerSample),
    Lift,
    FailNextImage,
    FailNextStore,
    SetConnected(bool),
}

/// Handle for controlling a mock fingerprint sensor.
///
/// Events are applied by the sensor on its next call, in the order sent.
#[derive(Debug, Clone)]
pub struct MockFingerprintHandle {
    /// Channel sender for sensor events
    event_tx: mpsc::UnboundedSender<FingerEvent>,

    /// Device name
    name: String,
}

impl MockFingerprintHandle {
    /// Put a finger on the sensor window.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn place_finger(&self, template: Vec<u8>, quality: u8) -> Result<()> {
        self.send(FingerEvent::Place(FingerSample::new(template, quality)))
    }

    /// Put a finger on the sensor window with default quality.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn place_finger_default_quality(&self, template: Vec<u8>) -> Result<()> {
        self.place_finger(template, DEFAULT_QUALITY_THRESHOLD)
    }

    /// Lift the finger off the sensor window.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn lift_finger(&self) -> Result<()> {
        self.send(FingerEvent::Lift)
    }

    /// Make the next image capture fail with a sensor error.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn fail_next_image(&self) -> Result<()> {
        self.send(FingerEvent::FailNextImage)
    }

    /// Make the next model store fail with a flash error.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn fail_next_store(&self) -> Result<()> {
        self.send(FingerEvent::FailNextStore)
    }

    /// Simulate unplugging (`false`) or reconnecting (`true`) the sensor.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor has been dropped.
    pub fn set_connected(&self, connected: bool) -> Result<()> {
        self.send(FingerEvent::SetConnected(connected))
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, event: FingerEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|_| HardwareError::disconnected("Fingerprint event channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: i64) -> SlotId {
        SlotId::new(id).unwrap()
    }

    fn enroll(sensor: &mut MockFingerprint, handle: &MockFingerprintHandle, id: i64) {
        handle.place_finger(vec![9, 8, 7], 90).unwrap();
        assert_eq!(sensor.get_image().unwrap(), ImageStatus::Captured);
        sensor.convert(TemplateBuffer::First).unwrap();
        assert_eq!(sensor.get_image().unwrap(), ImageStatus::Captured);
        sensor.convert(TemplateBuffer::Second).unwrap();
        assert_eq!(sensor.create_model().unwrap(), ModelMatch::Created);
        sensor.store_model(slot(id)).unwrap();
    }

    #[test]
    fn test_no_finger_by_default() {
        let (mut sensor, _handle) = MockFingerprint::new();
        assert_eq!(sensor.get_image().unwrap(), ImageStatus::NoFinger);
    }

    #[test]
    fn test_place_and_lift() {
        let (mut sensor, handle) = MockFingerprint::new();

        handle.place_finger(vec![1, 2, 3], 80).unwrap();
        assert_eq!(sensor.get_image().unwrap(), ImageStatus::Captured);

        handle.lift_finger().unwrap();
        assert_eq!(sensor.get_image().unwrap(), ImageStatus::NoFinger);
    }

    #[test]
    fn test_full_enrollment_stores_template() {
        let (mut sensor, handle) = MockFingerprint::new();
        enroll(&mut sensor, &handle, 4);

        assert_eq!(sensor.template_count(), 1);
        assert_eq!(sensor.template(slot(4)), Some(&vec![9, 8, 7]));
        assert_eq!(sensor.load_model(slot(4)).unwrap(), ModelPresence::Exists);
        assert_eq!(sensor.load_model(slot(5)).unwrap(), ModelPresence::Absent);
    }

    #[test]
    fn test_low_quality_conversion_fails() {
        let (mut sensor, handle) = MockFingerprint::new();
        handle.place_finger(vec![1, 2, 3], 20).unwrap();

        sensor.get_image().unwrap();
        let result = sensor.convert(TemplateBuffer::First);
        assert!(matches!(result, Err(HardwareError::Conversion { .. })));
    }

    #[test]
    fn test_convert_without_image_fails() {
        let (mut sensor, _handle) = MockFingerprint::new();
        assert!(sensor.convert(TemplateBuffer::First).is_err());
    }

    #[test]
    fn test_mismatch() {
        let (mut sensor, handle) = MockFingerprint::new();

        handle.place_finger(vec![1, 1, 1], 80).unwrap();
        sensor.get_image().unwrap();
        sensor.convert(TemplateBuffer::First).unwrap();

        handle.place_finger(vec![2, 2, 2], 80).unwrap();
        sensor.get_image().unwrap();
        sensor.convert(TemplateBuffer::Second).unwrap();

        assert_eq!(sensor.create_model().unwrap(), ModelMatch::Mismatch);
        assert!(sensor.store_model(slot(1)).is_err());
    }

    #[test]
    fn test_fail_next_image_is_one_shot() {
        let (mut sensor, handle) = MockFingerprint::new();
        handle.fail_next_image().unwrap();

        assert!(matches!(
            sensor.get_image(),
            Err(HardwareError::ImageCapture { .. })
        ));
        assert_eq!(sensor.get_image().unwrap(), ImageStatus::NoFinger);
    }

    #[test]
    fn test_fail_next_store() {
        let (mut sensor, handle) = MockFingerprint::new();
        handle.fail_next_store().unwrap();

        handle.place_finger(vec![3, 3], 80).unwrap();
        sensor.get_image().unwrap();
        sensor.convert(TemplateBuffer::First).unwrap();
        sensor.get_image().unwrap();
        sensor.convert(TemplateBuffer::Second).unwrap();
        sensor.create_model().unwrap();

        assert!(matches!(
            sensor.store_model(slot(2)),
            Err(HardwareError::FlashError { .. })
        ));
        assert_eq!(sensor.template_count(), 0);
    }

    #[test]
    fn test_delete_model() {
        let (mut sensor, handle) = MockFingerprint::new();
        enroll(&mut sensor, &handle, 3);

        sensor.delete_model(slot(3)).unwrap();
        assert_eq!(sensor.template_count(), 0);

        // Deleting an empty slot succeeds
        sensor.delete_model(slot(3)).unwrap();
    }

    #[test]
    fn test_disconnected_sensor_errors() {
        let (mut sensor, handle) = MockFingerprint::new();
        handle.set_connected(false).unwrap();

        assert!(matches!(
            sensor.get_image(),
            Err(HardwareError::Disconnected { .. })
        ));

        handle.set_connected(true).unwrap();
        assert!(sensor.get_image().is_ok());
    }

    #[test]
    fn test_preload() {
        let (mut sensor, _handle) = MockFingerprint::new();
        sensor.preload(slot(10), vec![1]);
        assert_eq!(sensor.load_model(slot(10)).unwrap(), ModelPresence::Exists);
    }

    #[test]
    fn test_handle_after_drop_errors() {
        let (sensor, handle) = MockFingerprint::new();
        drop(sensor);
        assert!(handle.lift_finger().is_err());
    }
}
