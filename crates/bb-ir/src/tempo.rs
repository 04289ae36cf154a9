//! Tempo and meter.
//!
//! `TempoConfig` is the single source for beat and measure durations.
//! Everything quantized to a musical boundary goes through it.

use crate::error::ConfigError;

/// A time signature such as 4/4 or 6/8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSignature {
    /// Beats per measure
    pub numerator: u32,
    /// Note value that gets one beat (4 = quarter, 8 = eighth)
    pub denominator: u32,
}

impl TimeSignature {
    /// Common time.
    pub const COMMON: Self = Self { numerator: 4, denominator: 4 };

    /// Create a validated time signature.
    ///
    /// The denominator must be a power of two between 1 and 32.
    pub fn new(numerator: u32, denominator: u32) -> Result<Self, ConfigError> {
        let valid_denominator = denominator.is_power_of_two() && denominator <= 32;
        if numerator == 0 || !valid_denominator {
            return Err(ConfigError::InvalidTimeSignature { numerator, denominator });
        }
        Ok(Self { numerator, denominator })
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

/// Tempo of a segment.
///
/// Invariant: `bpm` is positive and finite, `beats_per_measure >= 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoConfig {
    bpm: f64,
    signature: TimeSignature,
}

impl TempoConfig {
    /// Create a validated tempo.
    pub fn new(bpm: f64, signature: TimeSignature) -> Result<Self, ConfigError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::NonPositiveBpm(bpm));
        }
        let signature = TimeSignature::new(signature.numerator, signature.denominator)?;
        Ok(Self { bpm, signature })
    }

    /// Tempo in common time.
    pub fn common(bpm: f64) -> Result<Self, ConfigError> {
        Self::new(bpm, TimeSignature::COMMON)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn signature(&self) -> TimeSignature {
        self.signature
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.signature.numerator
    }

    /// Duration of one beat in seconds (60 / bpm).
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one measure in seconds.
    pub fn seconds_per_measure(&self) -> f64 {
        self.seconds_per_beat() * self.beats_per_measure() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn derived_durations() {
        let tempo = TempoConfig::common(120.0).unwrap();
        assert_relative_eq!(tempo.seconds_per_beat(), 0.5);
        assert_relative_eq!(tempo.seconds_per_measure(), 2.0);
    }

    #[test]
    fn three_four_measure() {
        let tempo = TempoConfig::new(90.0, TimeSignature::new(3, 4).unwrap()).unwrap();
        assert_eq!(tempo.beats_per_measure(), 3);
        assert_relative_eq!(tempo.seconds_per_measure(), 2.0);
    }

    #[test]
    fn rejects_non_positive_bpm() {
        assert_eq!(TempoConfig::common(0.0), Err(ConfigError::NonPositiveBpm(0.0)));
        assert_eq!(TempoConfig::common(-60.0), Err(ConfigError::NonPositiveBpm(-60.0)));
        assert!(TempoConfig::common(f64::NAN).is_err());
        assert!(TempoConfig::common(f64::INFINITY).is_err());
    }

    #[test]
    fn rejects_bad_signature() {
        assert!(TimeSignature::new(0, 4).is_err());
        assert!(TimeSignature::new(4, 3).is_err());
        assert!(TimeSignature::new(4, 64).is_err());
        assert!(TimeSignature::new(7, 8).is_ok());
    }
}
