//! Authored notes and their conversion to absolute time.
//!
//! Charts are written in musical terms (lane, measure, position, length).
//! They are converted once at load into `EventNote`s carrying seconds from
//! segment start; nothing at runtime re-derives them.

use alloc::vec::Vec;

use crate::error::ConfigError;
use crate::tempo::TempoConfig;

/// Rounding slack when snapping beat positions to whole beats.
const BEAT_EPSILON: f64 = 1e-9;

/// A timed note: which lane, and when (seconds from segment start).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventNote {
    pub lane: usize,
    pub time_stamp: f64,
}

impl EventNote {
    pub const fn new(lane: usize, time_stamp: f64) -> Self {
        Self { lane, time_stamp }
    }
}

/// Written note value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteLength {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl NoteLength {
    /// Fraction of a whole note, as a divisor (quarter = 4).
    pub const fn divisor(self) -> u32 {
        match self {
            NoteLength::Whole => 1,
            NoteLength::Half => 2,
            NoteLength::Quarter => 4,
            NoteLength::Eighth => 8,
            NoteLength::Sixteenth => 16,
            NoteLength::ThirtySecond => 32,
        }
    }

    /// Length in beats, where the beat unit is the signature's denominator.
    ///
    /// A quarter note is one beat in 4/4 and two beats in 6/8.
    pub fn beats(self, denominator: u32) -> f64 {
        denominator as f64 / self.divisor() as f64
    }
}

/// A note as written in a chart.
///
/// `position` counts steps of `length` from the start of the measure, so
/// (measure 1, position 3, eighth) is the fourth eighth of the second
/// measure. Measures are zero-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteDefinition {
    pub lane: usize,
    pub measure: u32,
    pub position: u32,
    pub length: NoteLength,
}

impl NoteDefinition {
    /// Offset from the start of the measure, in beats.
    pub fn beat_in_measure(&self, tempo: &TempoConfig) -> f64 {
        self.position as f64 * self.length.beats(tempo.signature().denominator)
    }

    /// Convert to an absolute note time.
    pub fn to_event_note(&self, tempo: &TempoConfig) -> Result<EventNote, ConfigError> {
        let beat = self.beat_in_measure(tempo);
        if beat >= tempo.beats_per_measure() as f64 {
            return Err(ConfigError::NoteOutsideMeasure {
                measure: self.measure,
                position: self.position,
            });
        }
        let total_beats = self.measure as f64 * tempo.beats_per_measure() as f64 + beat;
        Ok(EventNote::new(self.lane, total_beats * tempo.seconds_per_beat()))
    }
}

/// A musical position recovered from an absolute time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasurePosition {
    /// Zero-based measure
    pub measure: u32,
    /// Beats from the start of the measure
    pub beat: f64,
}

/// Inverse of `NoteDefinition::to_event_note`.
pub fn measure_position(tempo: &TempoConfig, time_stamp: f64) -> MeasurePosition {
    let mut total_beats = time_stamp / tempo.seconds_per_beat();
    let nearest = libm::round(total_beats);
    if libm::fabs(total_beats - nearest) < BEAT_EPSILON {
        total_beats = nearest;
    }
    let per_measure = tempo.beats_per_measure() as f64;
    let measure = libm::floor(total_beats / per_measure).max(0.0);
    MeasurePosition {
        measure: measure as u32,
        beat: total_beats - measure * per_measure,
    }
}

/// Convert a chart to note events sorted by time.
///
/// Notes at the same instant keep their authored order.
pub fn convert_chart(
    tempo: &TempoConfig,
    notes: &[NoteDefinition],
) -> Result<Vec<EventNote>, ConfigError> {
    let mut events = notes
        .iter()
        .map(|n| n.to_event_note(tempo))
        .collect::<Result<Vec<_>, _>>()?;
    events.sort_by(|a, b| a.time_stamp.total_cmp(&b.time_stamp));
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::TimeSignature;
    use approx::assert_relative_eq;

    fn def(lane: usize, measure: u32, position: u32, length: NoteLength) -> NoteDefinition {
        NoteDefinition { lane, measure, position, length }
    }

    #[test]
    fn quarter_notes_at_120() {
        let tempo = TempoConfig::common(120.0).unwrap();
        let note = def(0, 1, 2, NoteLength::Quarter).to_event_note(&tempo).unwrap();
        // measure 1 starts at 2.0s, third quarter is +1.0s
        assert_relative_eq!(note.time_stamp, 3.0);
    }

    #[test]
    fn eighths_in_six_eight() {
        let tempo = TempoConfig::new(120.0, TimeSignature::new(6, 8).unwrap()).unwrap();
        assert_eq!(NoteLength::Quarter.beats(8), 2.0);
        let note = def(2, 0, 5, NoteLength::Eighth).to_event_note(&tempo).unwrap();
        assert_relative_eq!(note.time_stamp, 2.5);
        assert_eq!(note.lane, 2);
    }

    #[test]
    fn position_past_measure_end() {
        let tempo = TempoConfig::common(120.0).unwrap();
        let err = def(0, 0, 4, NoteLength::Quarter).to_event_note(&tempo);
        assert_eq!(err, Err(ConfigError::NoteOutsideMeasure { measure: 0, position: 4 }));
        assert!(def(0, 0, 15, NoteLength::Sixteenth).to_event_note(&tempo).is_ok());
    }

    #[test]
    fn inverse_mapping_round_trips() {
        for bpm in [60.0, 90.0, 128.0, 173.0] {
            for sig in [TimeSignature::new(4, 4).unwrap(), TimeSignature::new(3, 4).unwrap(), TimeSignature::new(6, 8).unwrap()] {
                let tempo = TempoConfig::new(bpm, sig).unwrap();
                for measure in [0, 1, 7, 31] {
                    for position in 0..sig.numerator {
                        let authored = def(0, measure, position, NoteLength::Sixteenth);
                        let note = authored.to_event_note(&tempo).unwrap();
                        let back = measure_position(&tempo, note.time_stamp);
                        assert_eq!(back.measure, measure, "bpm {bpm} measure {measure} position {position}");
                        assert_relative_eq!(
                            back.beat,
                            authored.beat_in_measure(&tempo),
                            epsilon = 1e-9
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn chart_is_sorted_stably() {
        let tempo = TempoConfig::common(120.0).unwrap();
        let chart = [
            def(1, 1, 0, NoteLength::Quarter),
            def(0, 0, 1, NoteLength::Quarter),
            def(2, 0, 2, NoteLength::Eighth),
        ];
        let events = convert_chart(&tempo, &chart).unwrap();
        let lanes: Vec<usize> = events.iter().map(|e| e.lane).collect();
        // (0,1,quarter) and (0,2,eighth) both land on 0.5s
        assert_eq!(lanes, [0, 2, 1]);
    }
}
