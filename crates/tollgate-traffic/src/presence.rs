//! Presence detection from distance readings.

use serde::{Deserialize, Serialize};

use tollgate_core::constants::{DEFAULT_PRESENCE_MAX_M, DEFAULT_PRESENCE_MIN_M};
use tollgate_core::{DistanceReading, Echo};

/// Distance band, in meters, within which an object counts as present.
///
/// Both bounds are inclusive. Readings below `min_m` are near-field noise and
/// are excluded, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceBand {
    pub min_m: f32,
    pub max_m: f32,
}

impl Default for PresenceBand {
    fn default() -> Self {
        Self {
            min_m: DEFAULT_PRESENCE_MIN_M,
            max_m: DEFAULT_PRESENCE_MAX_M,
        }
    }
}

impl PresenceBand {
    pub fn new(min_m: f32, max_m: f32) -> Self {
        Self { min_m, max_m }
    }

    pub fn contains(&self, echo: Echo) -> bool {
        match echo {
            Echo::Distance(m) => m >= self.min_m && m <= self.max_m,
            Echo::NoEcho => false,
        }
    }
}

/// Turns the readings of the sensors watching one light into a present flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceFilter {
    band: PresenceBand,
}

impl PresenceFilter {
    pub fn new(band: PresenceBand) -> Self {
        Self { band }
    }

    pub fn band(&self) -> &PresenceBand {
        &self.band
    }

    /// Whether a single sensor sees something inside the band.
    pub fn is_occupied(&self, reading: &DistanceReading) -> bool {
        self.band.contains(reading.echo)
    }

    /// Logical OR of [`is_occupied`](Self::is_occupied) across the readings.
    ///
    /// No readings at all means nothing is present.
    pub fn is_present<'a, I>(&self, readings: I) -> bool
    where
        I: IntoIterator<Item = &'a DistanceReading>,
    {
        readings.into_iter().any(|r| self.is_occupied(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Instant;
    use tollgate_core::SensorId;

    fn reading(name: &str, echo: Echo) -> DistanceReading {
        DistanceReading::new(SensorId::new(name), echo, Instant::now())
    }

    #[rstest]
    #[case(Echo::Distance(0.25), true)]
    #[case(Echo::Distance(1.0), true)]
    #[case(Echo::Distance(2.25), true)]
    #[case(Echo::Distance(0.0), false)]
    #[case(Echo::Distance(0.1), false)]
    #[case(Echo::Distance(2.26), false)]
    #[case(Echo::Distance(4.0), false)]
    #[case(Echo::NoEcho, false)]
    fn test_default_band(#[case] echo: Echo, #[case] expected: bool) {
        let filter = PresenceFilter::default();
        assert_eq!(filter.is_occupied(&reading("left", echo)), expected);
    }

    #[test]
    fn test_presence_is_or_of_sensors() {
        let filter = PresenceFilter::default();
        let left = reading("left", Echo::Distance(1.0));
        let right = reading("right", Echo::NoEcho);

        assert!(filter.is_present([&left, &right]));
        assert!(filter.is_present([&right, &left]));
        assert!(!filter.is_present([&right]));
    }

    #[test]
    fn test_no_sensors_is_absent() {
        let filter = PresenceFilter::default();
        assert!(!filter.is_present(std::iter::empty()));
    }

    #[test]
    fn test_custom_band() {
        let filter = PresenceFilter::new(PresenceBand::new(0.5, 1.0));
        assert!(!filter.is_occupied(&reading("x", Echo::Distance(0.3))));
        assert!(filter.is_occupied(&reading("x", Echo::Distance(0.75))));
        assert!(!filter.is_occupied(&reading("x", Echo::Distance(1.5))));
    }

    #[test]
    fn test_band_deserializes_with_defaults() {
        let band: PresenceBand = serde_json::from_str(r#"{"max_m": 3.0}"#).unwrap();
        assert_eq!(band.min_m, DEFAULT_PRESENCE_MIN_M);
        assert_eq!(band.max_m, 3.0);
    }
}
