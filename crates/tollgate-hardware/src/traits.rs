//! Peripheral capability traits.
//!
//! These traits establish the contract between the gate controller and its
//! peripherals. Unlike blocking driver calls, every method here returns
//! immediately: a fingerprint sensor with nothing on its window answers
//! [`ImageStatus::NoFinger`] rather than waiting, and a tag reader hands back
//! only the bytes that already arrived. The controller turns waiting into
//! state-machine stages re-evaluated every tick.
//!
//! GPIO lines and microsecond delays use the `embedded-hal` 1.0 traits
//! directly; see `tollgate-traffic` for the ranging code built on them.

use crate::error::Result;
use crate::types::{ImageStatus, ModelMatch, ModelPresence, TemplateBuffer};
use tollgate_core::SlotId;

/// Optical fingerprint sensor with on-board template storage.
///
/// Models the usual R30x/AS608 command set: take an image, convert it into
/// one of two character buffers, merge both buffers into a model, and keep
/// models in numbered flash slots.
///
/// # Examples
///
/// ```
/// use tollgate_hardware::traits::FingerprintSensor;
/// use tollgate_hardware::types::ImageStatus;
/// use tollgate_hardware::Result;
///
/// fn finger_present<F: FingerprintSensor>(sensor: &mut F) -> Result<bool> {
///     Ok(matches!(sensor.get_image()?, ImageStatus::Captured))
/// }
/// ```
pub trait FingerprintSensor: Send {
    /// Try to take an image. Never waits for a finger.
    ///
    /// # Errors
    ///
    /// Returns an error for any sensor fault other than "no finger".
    fn get_image(&mut self) -> Result<ImageStatus>;

    /// Convert the current image into a template held in `buffer`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Conversion`](crate::HardwareError::Conversion)
    /// when the image is too poor to extract features.
    fn convert(&mut self, buffer: TemplateBuffer) -> Result<()>;

    /// Combine both template buffers into a model.
    ///
    /// # Errors
    ///
    /// Returns an error when the sensor fails for a reason other than a
    /// mismatch, which is reported as [`ModelMatch::Mismatch`].
    fn create_model(&mut self) -> Result<ModelMatch>;

    /// Persist the last created model in `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::FlashError`](crate::HardwareError::FlashError)
    /// if the sensor could not write the model.
    fn store_model(&mut self, slot: SlotId) -> Result<()>;

    /// Check whether `slot` holds a model.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor cannot be reached.
    fn load_model(&mut self, slot: SlotId) -> Result<ModelPresence>;

    /// Erase the model in `slot`. Erasing an empty slot succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the sensor rejects the command.
    fn delete_model(&mut self, slot: SlotId) -> Result<()>;
}

/// Byte-oriented input from the tag reader's serial link.
///
/// The link has no in-band framing; frame boundaries are inferred from
/// timing by the decoder.
pub trait TagByteSource: Send {
    /// Append every byte that has already arrived to `buf` and return how
    /// many were appended. Returns `Ok(0)` when nothing is pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the link failed.
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize>;
}

impl<T: FingerprintSensor + ?Sized> FingerprintSensor for Box<T> {
    fn get_image(&mut self) -> Result<ImageStatus> {
        (**self).get_image()
    }

    fn convert(&mut self, buffer: TemplateBuffer) -> Result<()> {
        (**self).convert(buffer)
    }

    fn create_model(&mut self) -> Result<ModelMatch> {
        (**self).create_model()
    }

    fn store_model(&mut self, slot: SlotId) -> Result<()> {
        (**self).store_model(slot)
    }

    fn load_model(&mut self, slot: SlotId) -> Result<ModelPresence> {
        (**self).load_model(slot)
    }

    fn delete_model(&mut self, slot: SlotId) -> Result<()> {
        (**self).delete_model(slot)
    }
}

impl<T: TagByteSource + ?Sized> TagByteSource for Box<T> {
    fn read_available(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        (**self).read_available(buf)
    }
}
