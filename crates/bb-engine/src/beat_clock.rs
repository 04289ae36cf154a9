//! Beat and measure arithmetic anchored at a segment start.

use bb_ir::{DspTime, TempoConfig};

/// Unit to quantize to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    Beat,
    Measure,
}

/// Converts audio-clock instants into beat and measure positions for one
/// segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatClock {
    tempo: TempoConfig,
    segment_start: DspTime,
}

impl BeatClock {
    pub fn new(tempo: TempoConfig, segment_start: DspTime) -> Self {
        Self { tempo, segment_start }
    }

    pub fn tempo(&self) -> &TempoConfig {
        &self.tempo
    }

    pub fn segment_start(&self) -> DspTime {
        self.segment_start
    }

    /// Seconds since the segment started (negative before it starts).
    pub fn elapsed(&self, time: DspTime) -> f64 {
        time - self.segment_start
    }

    /// Duration of one unit in seconds.
    pub fn unit_duration(&self, granularity: Granularity) -> f64 {
        match granularity {
            Granularity::Beat => self.tempo.seconds_per_beat(),
            Granularity::Measure => self.tempo.seconds_per_measure(),
        }
    }

    /// Whole beats elapsed since the segment start.
    pub fn beat_index_at(&self, time: DspTime) -> i64 {
        libm::floor(self.elapsed(time) / self.tempo.seconds_per_beat()) as i64
    }

    /// Whole measures elapsed since the segment start.
    pub fn measure_index_at(&self, time: DspTime) -> i64 {
        libm::floor(self.elapsed(time) / self.tempo.seconds_per_measure()) as i64
    }

    /// Position within the current beat, in [0, 1).
    pub fn beat_phase(&self, time: DspTime) -> f64 {
        let beats = self.elapsed(time) / self.tempo.seconds_per_beat();
        beats - libm::floor(beats)
    }

    /// The first boundary strictly after `time`.
    ///
    /// When `time` lands on a boundary (or rounding places the computed
    /// boundary at or before it) the result moves one unit further.
    pub fn next_boundary(&self, time: DspTime, granularity: Granularity) -> DspTime {
        let unit = self.unit_duration(granularity);
        let units = libm::ceil(self.elapsed(time) / unit);
        let mut boundary = self.segment_start + units * unit;
        if boundary <= time {
            boundary = self.segment_start + (units + 1.0) * unit;
        }
        boundary
    }
}
