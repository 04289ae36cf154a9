//! Audio-clock instants.

use core::cmp::Ordering;
use core::ops::{Add, Sub};

/// An instant on the audio hardware clock, in seconds.
///
/// Produced by a clock source, never by accumulating frame deltas.
/// Subtracting two instants yields a duration in seconds; adding a
/// duration yields a later instant. Equality and ordering are both total
/// (`f64::total_cmp`), so instants can key sorted queues.
#[derive(Clone, Copy, Debug, Default)]
pub struct DspTime(f64);

/// Fraction of a frame below which a computed instant counts as sitting on
/// the frame boundary.
const FRAME_EPSILON: f64 = 1e-6;

impl DspTime {
    /// The clock origin.
    pub const ZERO: Self = Self(0.0);

    /// Create an instant from seconds since the clock origin.
    pub const fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    /// Create an instant from a frame count at the given sample rate.
    pub fn from_frames(frames: u64, sample_rate: u32) -> Self {
        Self(frames as f64 / sample_rate as f64)
    }

    /// Seconds since the clock origin.
    pub const fn as_secs(self) -> f64 {
        self.0
    }

    /// First frame at or after this instant. Rounding noise just past a
    /// frame boundary does not push the result to the next frame.
    pub fn to_frames_ceil(self, sample_rate: u32) -> u64 {
        let frames = libm::ceil(self.0 * sample_rate as f64 - FRAME_EPSILON);
        if frames <= 0.0 {
            0
        } else {
            frames as u64
        }
    }

    /// The later of two instants.
    pub fn max(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl PartialEq for DspTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DspTime {}

impl PartialOrd for DspTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DspTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<f64> for DspTime {
    type Output = DspTime;

    fn add(self, secs: f64) -> DspTime {
        DspTime(self.0 + secs)
    }
}

impl Sub<f64> for DspTime {
    type Output = DspTime;

    fn sub(self, secs: f64) -> DspTime {
        DspTime(self.0 - secs)
    }
}

impl Sub for DspTime {
    type Output = f64;

    fn sub(self, earlier: DspTime) -> f64 {
        self.0 - earlier.0
    }
}
