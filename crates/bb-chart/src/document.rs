//! JSON sequence documents.
//!
//! A document names its clips, defines segments (tempo, meter, layers and an
//! optional chart) and lists the play order:
//!
//! ```json
//! {
//!   "clips": [{ "name": "intro", "path": "intro.wav" }],
//!   "segments": [{
//!     "name": "Intro",
//!     "bpm": 120,
//!     "time_signature": [4, 4],
//!     "layers": [{ "name": "Base", "clip": "intro", "primary": true }],
//!     "chart": [{ "lane": 0, "measure": 1, "position": 2, "length": "quarter" }]
//!   }],
//!   "order": ["Intro"]
//! }
//! ```

use bb_ir::NoteLength;
use serde::{Deserialize, Serialize};

/// A whole sequence file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SequenceDocument {
    /// Audio files to load into the clip bank; may be empty when clips
    /// are supplied by the caller
    #[serde(default)]
    pub clips: Vec<ClipDocument>,
    pub segments: Vec<SegmentDocument>,
    pub order: Vec<String>,
}

/// A named audio file, relative to the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDocument {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDocument {
    pub name: String,
    pub bpm: f64,
    /// `[numerator, denominator]`
    #[serde(default = "common_time")]
    pub time_signature: [u32; 2],
    pub layers: Vec<LayerDocument>,
    #[serde(default = "enabled")]
    pub layering: bool,
    #[serde(default)]
    pub chart: Vec<NoteDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDocument {
    pub name: String,
    pub clip: String,
    #[serde(default = "full_volume")]
    pub volume: f32,
    #[serde(default)]
    pub looping: bool,
    #[serde(default)]
    pub primary: bool,
}

/// An authored note: lane, zero-based measure, and position counted in
/// steps of `length`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteDocument {
    pub lane: usize,
    pub measure: u32,
    pub position: u32,
    #[serde(default)]
    pub length: NoteValue,
}

/// Written note value as it appears in documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteValue {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl From<NoteValue> for NoteLength {
    fn from(value: NoteValue) -> Self {
        match value {
            NoteValue::Whole => NoteLength::Whole,
            NoteValue::Half => NoteLength::Half,
            NoteValue::Quarter => NoteLength::Quarter,
            NoteValue::Eighth => NoteLength::Eighth,
            NoteValue::Sixteenth => NoteLength::Sixteenth,
            NoteValue::ThirtySecond => NoteLength::ThirtySecond,
        }
    }
}

fn common_time() -> [u32; 2] {
    [4, 4]
}

fn enabled() -> bool {
    true
}

fn full_volume() -> f32 {
    1.0
}
