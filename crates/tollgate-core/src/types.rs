use crate::{
    Result,
    constants::{MAX_FRAME_WIDTH, MAX_SLOT_ID, MIN_SLOT_ID},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Fingerprint template slot on the sensor (1-127).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct SlotId(u8);

impl SlotId {
    /// Create a new slot id with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidSlot` if the id is outside the valid range (1-127).
    pub fn new(id: i64) -> Result<Self> {
        if !(i64::from(MIN_SLOT_ID)..=i64::from(MAX_SLOT_ID)).contains(&id) {
            return Err(Error::InvalidSlot {
                value: id,
                min: MIN_SLOT_ID,
                max: MAX_SLOT_ID,
            });
        }
        Ok(SlotId(id as u8))
    }

    /// Get the raw slot id as u8.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Iterate over every valid slot, lowest first.
    pub fn all() -> impl Iterator<Item = SlotId> {
        (MIN_SLOT_ID..=MAX_SLOT_ID).map(SlotId)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SlotId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: i64 = s.trim().parse().map_err(|_| Error::InvalidSlot {
            value: -1,
            min: MIN_SLOT_ID,
            max: MAX_SLOT_ID,
        })?;
        SlotId::new(id)
    }
}

impl TryFrom<i64> for SlotId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        SlotId::new(value)
    }
}

impl From<SlotId> for u8 {
    fn from(slot: SlotId) -> u8 {
        slot.0
    }
}

/// Tag identifier: uppercase hexadecimal rendering of a tag frame.
///
/// `[0x01, 0x02, 0x03, 0x04]` becomes `"01020304"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagId(String);

impl TagId {
    /// Build a tag id from raw frame bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidTag` for an empty slice or more than 8 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() || bytes.len() > MAX_FRAME_WIDTH {
            return Err(Error::InvalidTag(format!(
                "Tag must be 1-{MAX_FRAME_WIDTH} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(TagId(bytes.iter().map(|b| format!("{b:02X}")).collect()))
    }

    /// Parse a tag id from its hex form (case-insensitive).
    ///
    /// # Errors
    /// Returns `Error::InvalidTag` if the text is not an even-length hex string
    /// of 1-8 bytes.
    pub fn parse(text: &str) -> Result<Self> {
        let hex = text.trim().to_uppercase();
        let len = hex.len();
        if len == 0 || len % 2 != 0 || len > MAX_FRAME_WIDTH * 2 {
            return Err(Error::InvalidTag(format!(
                "Tag hex must be 2-{} even chars, got {len}",
                MAX_FRAME_WIDTH * 2
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidTag(format!("Tag is not hexadecimal: {hex}")));
        }
        Ok(TagId(hex))
    }

    /// Get the tag id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes the identifier encodes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.0.len() / 2
    }

    /// Decimal value of the identifier (big-endian).
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        u64::from_str_radix(&self.0, 16).unwrap_or(0)
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagId::parse(s)
    }
}

impl TryFrom<String> for TagId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        TagId::parse(&value)
    }
}

impl From<TagId> for String {
    fn from(tag: TagId) -> String {
        tag.0
    }
}

/// Name of an ultrasonic sensor (e.g. `vehicle-left`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorId(String);

impl SensorId {
    pub fn new(name: impl Into<String>) -> Self {
        SensorId(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one time-of-flight measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Echo {
    /// Echo received; distance in meters.
    Distance(f32),

    /// No echo within the timeout. Never the same thing as "clear at zero".
    NoEcho,
}

impl Echo {
    /// Distance in meters, if an echo was received.
    #[must_use]
    pub fn meters(&self) -> Option<f32> {
        match self {
            Echo::Distance(m) => Some(*m),
            Echo::NoEcho => None,
        }
    }
}

/// One reading from one sensor, produced once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceReading {
    pub sensor_id: SensorId,
    pub echo: Echo,
    pub measured_at: Instant,
}

impl DistanceReading {
    pub fn new(sensor_id: SensorId, echo: Echo, measured_at: Instant) -> Self {
        Self {
            sensor_id,
            echo,
            measured_at,
        }
    }

    /// Shorthand for a reading with an echo at `meters`.
    pub fn meters(sensor_id: SensorId, meters: f32, measured_at: Instant) -> Self {
        Self::new(sensor_id, Echo::Distance(meters), measured_at)
    }

    /// Shorthand for a timed-out reading.
    pub fn no_echo(sensor_id: SensorId, measured_at: Instant) -> Self {
        Self::new(sensor_id, Echo::NoEcho, measured_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(64)]
    #[case(127)]
    fn test_slot_id_valid(#[case] id: i64) {
        let slot = SlotId::new(id).unwrap();
        assert_eq!(i64::from(slot.as_u8()), id);
    }

    #[rstest]
    #[case(0)]
    #[case(128)]
    #[case(-3)]
    fn test_slot_id_out_of_range(#[case] id: i64) {
        assert!(matches!(
            SlotId::new(id),
            Err(Error::InvalidSlot { value, .. }) if value == id
        ));
    }

    #[test]
    fn test_slot_id_from_str() {
        assert_eq!("12".parse::<SlotId>().unwrap().as_u8(), 12);
        assert!("abc".parse::<SlotId>().is_err());
    }

    #[test]
    fn test_slot_all_covers_range() {
        let slots: Vec<SlotId> = SlotId::all().collect();
        assert_eq!(slots.len(), 127);
        assert_eq!(slots[0].as_u8(), 1);
        assert_eq!(slots[126].as_u8(), 127);
    }

    #[test]
    fn test_slot_serde_rejects_out_of_range() {
        assert!(serde_json::from_str::<SlotId>("0").is_err());
        let slot: SlotId = serde_json::from_str("5").unwrap();
        assert_eq!(serde_json::to_string(&slot).unwrap(), "5");
    }

    #[test]
    fn test_tag_from_bytes_is_uppercase_hex() {
        let tag = TagId::from_bytes(&[0x01, 0x02, 0xAB, 0x0F]).unwrap();
        assert_eq!(tag.as_str(), "0102AB0F");
        assert_eq!(tag.byte_len(), 4);
    }

    #[test]
    fn test_tag_from_bytes_rejects_bad_width() {
        assert!(TagId::from_bytes(&[]).is_err());
        assert!(TagId::from_bytes(&[0; 9]).is_err());
    }

    #[test]
    fn test_tag_parse_normalizes_case() {
        let tag = TagId::parse(" 0a0b ").unwrap();
        assert_eq!(tag.as_str(), "0A0B");
    }

    #[rstest]
    #[case("")]
    #[case("ABC")]
    #[case("ZZZZ")]
    #[case("000000000000000000")]
    fn test_tag_parse_rejects(#[case] text: &str) {
        assert!(TagId::parse(text).is_err());
    }

    #[test]
    fn test_tag_decimal() {
        let tag = TagId::from_bytes(&[0x01, 0x02, 0x03, 0x04]).unwrap();
        assert_eq!(tag.as_u64(), 16_909_060);
    }

    #[test]
    fn test_echo_meters() {
        assert_eq!(Echo::Distance(1.5).meters(), Some(1.5));
        assert_eq!(Echo::NoEcho.meters(), None);
    }
}
