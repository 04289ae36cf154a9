//! Error taxonomy.
//!
//! `ConfigError` is fatal at load time and keeps a sequence from starting.
//! `PlayError` covers recoverable runtime faults: the offending operation
//! becomes a no-op and play continues.

use alloc::string::String;

/// Malformed configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tempo must be positive and finite, got {0} BPM")]
    NonPositiveBpm(f64),
    #[error("time signature {numerator}/{denominator} is invalid")]
    InvalidTimeSignature { numerator: u32, denominator: u32 },
    #[error("unknown segment '{0}'")]
    UnknownSegment(String),
    #[error("segment '{segment}' has no layer named '{layer}'")]
    UnknownLayer { segment: String, layer: String },
    #[error("unknown clip '{0}'")]
    UnknownClip(String),
    #[error("segment '{0}' has no primary layer")]
    MissingPrimary(String),
    #[error("segment '{0}' has more than one primary layer")]
    MultiplePrimary(String),
    #[error("segment '{0}' is defined twice")]
    DuplicateSegment(String),
    #[error("segment '{segment}' defines layer '{layer}' twice")]
    DuplicateLayer { segment: String, layer: String },
    #[error("name '{0}' exceeds 32 bytes")]
    NameTooLong(String),
    #[error("sequence has no segments")]
    EmptySequence,
    #[error("volume {0} is outside [0, 1]")]
    VolumeOutOfRange(f32),
    #[error("note at measure {measure} position {position} does not fit in the measure")]
    NoteOutsideMeasure { measure: u32, position: u32 },
    #[error("{what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },
    #[error("lane {lane} maps to note kind {kind}, only {kinds} kinds configured")]
    UnknownNoteKind { lane: usize, kind: usize, kinds: usize },
}

/// Recoverable runtime fault.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayError {
    #[error("{what} index {index} is out of range (0..{len})")]
    OutOfRange { what: &'static str, index: usize, len: usize },
    #[error("note at {time_stamp}s on lane {lane} was already judged")]
    DuplicateJudgment { lane: usize, time_stamp: f64 },
    #[error("layer '{0}' is already playing")]
    AlreadyPlaying(String),
    #[error("no segment is active")]
    NotActive,
    #[error("layering is disabled for segment '{0}'")]
    LayeringDisabled(String),
}
